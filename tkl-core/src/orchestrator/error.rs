use thiserror::Error;

use crate::gateways::GatewayError;
use crate::pricing::PromoRejection;
use crate::store::StoreError;

/// Failures of customer-facing order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Malformed or inconsistent input, reported against one field.
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Promo(#[from] PromoRejection),
    /// The order exists but the gateway could not issue an invoice. The order
    /// stays PENDING and can be resumed with its code.
    #[error("payment could not be started: {source}")]
    InvoiceFailed {
        order_code: String,
        #[source]
        source: GatewayError,
    },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl OrderError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        OrderError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Order code the customer can quote to support, when one exists.
    pub fn order_code(&self) -> Option<&str> {
        match self {
            OrderError::InvoiceFailed { order_code, .. } => Some(order_code),
            _ => None,
        }
    }
}

/// Failures of inbound webhook handling.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("malformed webhook payload: {0}")]
    Malformed(String),
    #[error("no order matches this webhook")]
    OrderNotFound,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
