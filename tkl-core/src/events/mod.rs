//! Event system for background fulfillment.
//!
//! # Event Flow
//!
//! 1. Orchestrator marks an order PAID and emits `FulfillmentJob` -> `FulfillmentWorker`
//! 2. `FulfillmentWorker` re-emits the job with a later attempt on transient failure
//! 3. `Reconciler` re-emits jobs for PAID orders nobody picked up
//!
//! The channel is in memory; the orders table is the durable queue.

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, FulfillmentJobReceiver, FulfillmentJobSender, fulfillment_channel,
};
pub use types::FulfillmentJob;
