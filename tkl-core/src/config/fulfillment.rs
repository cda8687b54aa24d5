//! Fulfillment and reconciliation timing.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FulfillmentConfig {
    /// Attempts per job before the order is forced to FAILED.
    pub max_attempts: u32,
    /// Jobs run in parallel by the worker.
    pub concurrency: usize,
    /// Delay before the first retry; doubles on each following one.
    pub initial_backoff: Duration,
    /// PROCESSING orders untouched for this long are forced to FAILED.
    pub stuck_after: Duration,
    /// PAID orders untouched for this long are enqueued again.
    pub requeue_paid_after: Duration,
    /// Period of the reconciliation sweep.
    pub sweep_interval: Duration,
    /// Maximum orders handled per sweep step.
    pub sweep_batch: i64,
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            concurrency: 4,
            initial_backoff: Duration::from_secs(2),
            stuck_after: Duration::from_secs(60 * 60),
            requeue_paid_after: Duration::from_secs(2 * 60),
            sweep_interval: Duration::from_secs(60),
            sweep_batch: 100,
        }
    }
}
