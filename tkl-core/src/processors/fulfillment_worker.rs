//! FulfillmentWorker processor.
//!
//! The FulfillmentWorker is responsible for:
//! - Receiving `FulfillmentJob` from the queue
//! - Running the attempt through the orchestrator, a bounded number at a time
//! - Re-sending the job after an exponential backoff on transient failure

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::events::{FulfillmentJob, FulfillmentJobReceiver, FulfillmentJobSender};
use crate::orchestrator::{AttemptOutcome, Orchestrator};

/// FulfillmentWorker delivers paid orders through the topup provider.
pub struct FulfillmentWorker {
    orchestrator: Arc<Orchestrator>,
    job_rx: FulfillmentJobReceiver,
    retry_tx: FulfillmentJobSender,
    shutdown_rx: watch::Receiver<bool>,
    permits: Arc<Semaphore>,
}

impl FulfillmentWorker {
    /// Create a new FulfillmentWorker.
    ///
    /// # Arguments
    ///
    /// * `orchestrator` - Shared order orchestrator
    /// * `job_rx` - Receiver for FulfillmentJob events
    /// * `retry_tx` - Sender used to schedule later attempts
    /// * `shutdown_rx` - Receiver for shutdown signal
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        job_rx: FulfillmentJobReceiver,
        retry_tx: FulfillmentJobSender,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let concurrency = orchestrator.fulfillment_config().concurrency.max(1);
        Self {
            orchestrator,
            job_rx,
            retry_tx,
            shutdown_rx,
            permits: Arc::new(Semaphore::new(concurrency)),
        }
    }

    /// Run the FulfillmentWorker.
    pub async fn run(mut self) {
        info!("FulfillmentWorker started");

        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                biased;

                // Check for shutdown
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("FulfillmentWorker received shutdown signal");
                        break;
                    }
                }

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Fulfillment task panicked");
                    }
                }

                // Receive FulfillmentJob events
                Some(job) = self.job_rx.recv() => {
                    debug!(order_id = %job.order_id, attempt = job.attempt, "Received FulfillmentJob");

                    let Ok(permit) = self.permits.clone().acquire_owned().await else {
                        break;
                    };
                    let orchestrator = self.orchestrator.clone();
                    let retry_tx = self.retry_tx.clone();
                    tasks.spawn(async move {
                        Self::process_job(&orchestrator, &retry_tx, job).await;
                        drop(permit);
                    });
                }

                else => {
                    info!("FulfillmentJob channel closed");
                    break;
                }
            }
        }

        // Let in-flight attempts finish writing their results
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Fulfillment task panicked");
            }
        }

        info!("FulfillmentWorker shutdown complete");
    }

    async fn process_job(
        orchestrator: &Orchestrator,
        retry_tx: &FulfillmentJobSender,
        job: FulfillmentJob,
    ) {
        match orchestrator.run_fulfillment(&job).await {
            Ok(AttemptOutcome::Skipped(reason)) => {
                debug!(order_id = %job.order_id, reason, "Fulfillment job skipped");
            }
            Ok(AttemptOutcome::Settled(status)) => {
                info!(order_id = %job.order_id, status = %status, "Fulfillment settled");
            }
            Ok(AttemptOutcome::InFlight) => {
                debug!(order_id = %job.order_id, "Fulfillment awaiting provider");
            }
            Ok(AttemptOutcome::Retry { delay }) => {
                Self::schedule_retry(retry_tx.clone(), job.next_attempt(), delay);
            }
            Err(e) => {
                // Store trouble: the order is still PAID or PROCESSING and the
                // reconciler will see it again.
                error!(order_id = %job.order_id, error = %e, "Fulfillment attempt errored");
            }
        }
    }

    fn schedule_retry(retry_tx: FulfillmentJobSender, job: FulfillmentJob, delay: Duration) {
        info!(
            order_id = %job.order_id,
            attempt = job.attempt,
            delay_ms = delay.as_millis() as u64,
            "Scheduling fulfillment retry"
        );
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = retry_tx.send(job).await {
                warn!(order_id = %e.0.order_id, "Fulfillment queue closed before retry");
            }
        });
    }
}
