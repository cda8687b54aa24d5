//! Reconciler processor.
//!
//! Runs [`Orchestrator::reconcile`] every `sweep_interval` so that orders
//! missed by webhooks or by the in-memory queue still settle.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::orchestrator::Orchestrator;

pub struct Reconciler {
    orchestrator: Arc<Orchestrator>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Reconciler {
    pub fn new(orchestrator: Arc<Orchestrator>, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            orchestrator,
            shutdown_rx,
        }
    }

    /// Run the Reconciler.
    pub async fn run(mut self) {
        let period = self.orchestrator.fulfillment_config().sweep_interval;
        info!(period_secs = period.as_secs(), "Reconciler started");

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("Reconciler received shutdown signal");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    match self.orchestrator.reconcile().await {
                        Ok(report) if report.is_empty() => debug!("Reconcile sweep found nothing"),
                        Ok(report) => info!(
                            requeued = report.requeued,
                            polled = report.polled,
                            settled = report.settled,
                            timed_out = report.timed_out,
                            expired = report.expired,
                            "Reconcile sweep finished"
                        ),
                        Err(e) => error!(error = %e, "Reconcile sweep failed"),
                    }
                }
            }
        }

        info!("Reconciler shutdown complete");
    }
}
