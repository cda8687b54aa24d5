//! Event type definitions.
//!
//! Events carry identifiers rather than full rows; consumers reload the
//! order from the store before acting.

use uuid::Uuid;

/// Request to deliver a paid order.
///
/// Delivery is at-least-once: the same job can arrive again from the
/// reconciler, so the worker re-checks the order status before acting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillmentJob {
    pub order_id: Uuid,
    pub idempotency_key: String,
    /// 1-based attempt number.
    pub attempt: u32,
}

impl FulfillmentJob {
    pub fn first(order_id: Uuid, idempotency_key: impl Into<String>) -> Self {
        Self {
            order_id,
            idempotency_key: idempotency_key.into(),
            attempt: 1,
        }
    }

    pub fn next_attempt(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }
}
