//! Background processors.
//!
//! - `FulfillmentWorker`: Receives `FulfillmentJob`, runs fulfillment attempts, re-emits retries
//! - `Reconciler`: Periodic sweep, emits `FulfillmentJob` for PAID orders left behind

pub mod fulfillment_worker;
pub mod reconciler;
#[cfg(test)]
mod test_support;

pub use fulfillment_worker::FulfillmentWorker;
pub use reconciler::Reconciler;
