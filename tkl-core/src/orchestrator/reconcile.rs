//! Periodic repair of orders whose webhook or job went missing.

use std::time::Duration;

use serde_json::json;
use time::PrimitiveDateTime;
use tkl_sdk::objects::WebhookOutcome;
use tracing::{debug, info, warn};

use super::fulfillment::TopupUpdate;
use super::{Orchestrator, OrderError};
use crate::entities::OrderStatus;
use crate::entities::order::{Order, OrderPatch, StaleCutoff};
use crate::entities::transaction_log::LogKind;
use crate::events::FulfillmentJob;
use crate::gateways::{GatewayError, InvoiceDetails, InvoiceStatus, PaymentEvent};
use crate::providers::ProviderError;
use crate::utils::backoff::retry_delay;
use crate::utils::clock::{now, to_unix};

/// Counts of what one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// PAID orders and interrupted retries handed to the worker again.
    pub requeued: usize,
    /// Orders whose provider or invoice status was polled.
    pub polled: usize,
    /// Orders moved to a terminal status by polling.
    pub settled: usize,
    /// PROCESSING orders forced to FAILED after `stuck_after`.
    pub timed_out: usize,
    /// PENDING or WAITING_PAYMENT orders moved to EXPIRED.
    pub expired: usize,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Orchestrator {
    /// Run every reconciliation step once.
    pub async fn reconcile(&self) -> Result<ReconcileReport, OrderError> {
        let mut report = ReconcileReport::default();
        self.requeue_paid(&mut report).await?;
        self.resume_retries(&mut report).await?;
        self.poll_processing(&mut report).await?;
        self.fail_stuck(&mut report).await?;
        self.poll_expired_invoices(&mut report).await?;
        self.expire_abandoned(&mut report).await?;
        Ok(report)
    }

    fn ago(&self, d: Duration) -> PrimitiveDateTime {
        now() - d
    }

    async fn requeue_paid(&self, report: &mut ReconcileReport) -> Result<(), OrderError> {
        let cutoff = StaleCutoff::UpdatedBefore(self.ago(self.fulfillment.requeue_paid_after));
        let orders = self
            .store
            .orders_in_status(&[OrderStatus::Paid], cutoff, self.fulfillment.sweep_batch)
            .await?;
        for order in orders {
            debug!(order_id = %order.id, "Re-enqueueing PAID order");
            self.enqueue(&order);
            report.requeued += 1;
        }
        Ok(())
    }

    /// PROCESSING orders the provider never accepted, with attempts left.
    ///
    /// Their retry lived only in the worker and was lost to a restart.
    async fn resume_retries(&self, report: &mut ReconcileReport) -> Result<(), OrderError> {
        let max_attempts = self.fulfillment.max_attempts.max(1);
        let window = self
            .fulfillment
            .requeue_paid_after
            .max(retry_delay(self.fulfillment.initial_backoff, max_attempts));
        let cutoff = StaleCutoff::UpdatedBefore(self.ago(window));
        let orders = self
            .store
            .orders_in_status(&[OrderStatus::Processing], cutoff, self.fulfillment.sweep_batch)
            .await?;
        for order in orders.iter().filter(|o| self.has_retry_left(o)) {
            let job = FulfillmentJob {
                order_id: order.id,
                idempotency_key: order.idempotency_key.clone(),
                attempt: order.fulfillment_attempts as u32 + 1,
            };
            debug!(order_id = %order.id, attempt = job.attempt, "Resuming interrupted fulfillment retry");
            if let Err(e) = self.jobs.try_send(job) {
                warn!(order_id = %order.id, error = %e, "Fulfillment queue unavailable");
                continue;
            }
            report.requeued += 1;
        }
        Ok(())
    }

    fn has_retry_left(&self, order: &Order) -> bool {
        order.provider_order_id.is_none()
            && order.fulfillment_attempts >= 1
            && (order.fulfillment_attempts as u32) < self.fulfillment.max_attempts.max(1)
    }

    async fn poll_processing(&self, report: &mut ReconcileReport) -> Result<(), OrderError> {
        let cutoff = StaleCutoff::UpdatedBefore(self.ago(self.fulfillment.sweep_interval));
        let orders = self
            .store
            .orders_in_status(&[OrderStatus::Processing], cutoff, self.fulfillment.sweep_batch)
            .await?;
        for order in orders {
            let Some(provider_order_id) = order.provider_order_id.clone() else {
                continue;
            };
            report.polled += 1;
            let status = match self.provider.get_status(&provider_order_id).await {
                Ok(status) => status,
                Err(ProviderError::NotFound(message)) => {
                    warn!(order_id = %order.id, %message, "Provider has no record of the order");
                    continue;
                }
                Err(e) => {
                    warn!(order_id = %order.id, error = %e, "Provider status poll failed");
                    continue;
                }
            };
            if !status.status.is_final() {
                continue;
            }
            let update = TopupUpdate {
                status: status.status,
                provider_order_id: Some(provider_order_id.clone()),
                provider_status: status.status.as_str().to_string(),
                message: status.message.clone(),
                voucher_code: status.voucher_code,
            };
            if let Some(updated) = self.apply_topup(order.id, update).await? {
                report.settled += 1;
                self.audit(
                    updated.id,
                    LogKind::Reconciled,
                    json!({
                        "step": "provider_status",
                        "providerOrderId": provider_order_id,
                        "status": status.status.as_str(),
                        "message": status.message,
                    }),
                )
                .await;
            }
        }
        Ok(())
    }

    async fn fail_stuck(&self, report: &mut ReconcileReport) -> Result<(), OrderError> {
        let cutoff = StaleCutoff::UpdatedBefore(self.ago(self.fulfillment.stuck_after));
        let orders = self
            .store
            .orders_in_status(&[OrderStatus::Processing], cutoff, self.fulfillment.sweep_batch)
            .await?;
        for order in orders {
            if self.has_retry_left(&order) {
                continue;
            }
            let patch = OrderPatch::error("Fulfillment timed out waiting for the provider");
            let Some(updated) = self
                .store
                .transition(order.id, &[OrderStatus::Processing], OrderStatus::Failed, patch)
                .await?
            else {
                continue;
            };
            warn!(order_id = %updated.id, "PROCESSING order timed out");
            report.timed_out += 1;
            self.audit(
                updated.id,
                LogKind::Reconciled,
                json!({ "step": "stuck_processing", "since": to_unix(order.updated_at) }),
            )
            .await;
        }
        Ok(())
    }

    async fn poll_expired_invoices(&self, report: &mut ReconcileReport) -> Result<(), OrderError> {
        let cutoff = StaleCutoff::InvoiceExpiredBefore(now());
        let orders = self
            .store
            .orders_in_status(
                &[OrderStatus::WaitingPayment],
                cutoff,
                self.fulfillment.sweep_batch,
            )
            .await?;
        for order in orders {
            let Some(invoice_id) = order.payment_ref.clone() else {
                continue;
            };
            report.polled += 1;
            let details = match self.gateway.get_invoice(&invoice_id).await {
                Ok(details) => details,
                // The gateway forgot the invoice; nothing can be paid any more.
                Err(GatewayError::InvoiceNotFound(_)) => InvoiceDetails {
                    invoice_id: invoice_id.clone(),
                    status: InvoiceStatus::Expired,
                    amount: None,
                    paid_at: None,
                },
                Err(e) => {
                    warn!(order_id = %order.id, error = %e, "Invoice poll failed");
                    continue;
                }
            };
            // Still open at the gateway after its expiry: treat as expired.
            let status = match details.status {
                InvoiceStatus::Pending(_) => InvoiceStatus::Expired,
                other => other,
            };
            let event = PaymentEvent {
                status,
                invoice_id,
                order_id: Some(order.id),
                amount: details.amount,
                payment_method: None,
                paid_at: details.paid_at,
                event_id: None,
            };
            let applied = self.apply_payment(&order, &event).await?;
            if applied.outcome != WebhookOutcome::Processed {
                continue;
            }
            match event.status {
                InvoiceStatus::Expired => report.expired += 1,
                _ => report.settled += 1,
            }
            info!(order_id = %order.id, invoice_id = %event.invoice_id, "Invoice reconciled");
            self.audit(
                order.id,
                LogKind::Reconciled,
                json!({ "step": "invoice_status", "invoiceId": event.invoice_id }),
            )
            .await;
        }
        Ok(())
    }

    /// PENDING orders whose invoice was never opened expire after the
    /// invoice lifetime.
    async fn expire_abandoned(&self, report: &mut ReconcileReport) -> Result<(), OrderError> {
        let cutoff = StaleCutoff::UpdatedBefore(self.ago(self.checkout.invoice_ttl));
        let orders = self
            .store
            .orders_in_status(&[OrderStatus::Pending], cutoff, self.fulfillment.sweep_batch)
            .await?;
        for order in orders {
            let patch = OrderPatch::error("Checkout was never completed");
            let Some(updated) = self
                .store
                .transition(order.id, &[OrderStatus::Pending], OrderStatus::Expired, patch)
                .await?
            else {
                continue;
            };
            report.expired += 1;
            self.audit(
                updated.id,
                LogKind::Reconciled,
                json!({ "step": "abandoned_checkout" }),
            )
            .await;
        }
        Ok(())
    }
}
