//! Event channel factories and handles.

use super::types::FulfillmentJob;
use tokio::sync::mpsc;

/// Default buffer size for event channels.
///
/// This provides enough buffer to handle bursts while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for FulfillmentJob events.
pub type FulfillmentJobSender = mpsc::Sender<FulfillmentJob>;
/// Receiver handle for FulfillmentJob events.
pub type FulfillmentJobReceiver = mpsc::Receiver<FulfillmentJob>;

/// Create a new FulfillmentJob channel.
///
/// Returns a (sender, receiver) pair. The orchestrator, the worker (for
/// retries) and the reconciler each hold a clone of the sender.
pub fn fulfillment_channel() -> (FulfillmentJobSender, FulfillmentJobReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
