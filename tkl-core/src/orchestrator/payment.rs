//! Payment webhooks and the transitions they drive.

use serde_json::json;
use tkl_sdk::objects::WebhookOutcome;
use tracing::{info, warn};

use super::{Orchestrator, WebhookError};
use crate::entities::OrderStatus;
use crate::entities::order::{Order, OrderPatch};
use crate::entities::transaction_log::LogKind;
use crate::entities::webhook_event::{
    FinishWebhookEvent, WebhookEventInsert, WebhookEventOutcome,
};
use crate::gateways::{InvoiceStatus, PaymentEvent};
use crate::store::StoreError;
use crate::utils::clock::now;

const UNPAID: &[OrderStatus] = &[OrderStatus::Pending, OrderStatus::WaitingPayment];

/// What applying a payment update did, plus a note for the webhook record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Applied {
    pub outcome: WebhookOutcome,
    pub note: Option<String>,
}

impl Applied {
    fn new(outcome: WebhookOutcome) -> Self {
        Self {
            outcome,
            note: None,
        }
    }

    fn noted(outcome: WebhookOutcome, note: impl Into<String>) -> Self {
        Self {
            outcome,
            note: Some(note.into()),
        }
    }
}

impl Orchestrator {
    /// Record an inbound webhook before anything else looks at it.
    pub(crate) async fn record_webhook(
        &self,
        source: String,
        signature: Option<&str>,
        payload: &[u8],
    ) -> Result<i64, WebhookError> {
        let id = self
            .store
            .record_webhook(WebhookEventInsert {
                source,
                external_id: None,
                signature: signature.map(str::to_string),
                payload: String::from_utf8_lossy(payload).into_owned(),
            })
            .await?;
        Ok(id)
    }

    pub(crate) async fn finish_webhook(
        &self,
        id: i64,
        external_id: Option<String>,
        outcome: WebhookEventOutcome,
        error: Option<String>,
    ) {
        let finish = FinishWebhookEvent {
            id,
            external_id,
            outcome,
            error,
        };
        if let Err(e) = self.store.finish_webhook(finish).await {
            warn!(webhook_event_id = id, error = %e, "Failed to record webhook outcome");
        }
    }

    /// Authenticate, parse and apply a payment gateway webhook.
    ///
    /// Every call is recorded first, including ones that fail verification.
    #[tracing::instrument(skip_all, fields(gateway = self.gateway.name()))]
    pub async fn handle_payment_webhook(
        &self,
        signature: Option<&str>,
        payload: &[u8],
    ) -> Result<WebhookOutcome, WebhookError> {
        let source = format!("payment:{}", self.gateway.name());
        let event_id = self.record_webhook(source, signature, payload).await?;

        if !self.gateway.verify_webhook(signature, payload) {
            warn!(webhook_event_id = event_id, "Payment webhook signature rejected");
            self.finish_webhook(
                event_id,
                None,
                WebhookEventOutcome::Rejected,
                Some("invalid signature".into()),
            )
            .await;
            return Err(WebhookError::InvalidSignature);
        }

        let event = match self.gateway.parse_event(payload) {
            Ok(event) => event,
            Err(e) => {
                self.finish_webhook(
                    event_id,
                    None,
                    WebhookEventOutcome::Rejected,
                    Some(e.to_string()),
                )
                .await;
                return Err(WebhookError::Malformed(e.to_string()));
            }
        };
        let external_id = event
            .event_id
            .clone()
            .or_else(|| Some(event.invoice_id.clone()));

        let Some(order) = self.order_for_payment(&event).await? else {
            warn!(invoice_id = %event.invoice_id, "Payment webhook for unknown order");
            self.finish_webhook(
                event_id,
                external_id,
                WebhookEventOutcome::Failed,
                Some("order not found".into()),
            )
            .await;
            return Err(WebhookError::OrderNotFound);
        };

        let applied = match self.apply_payment(&order, &event).await {
            Ok(applied) => applied,
            Err(e) => {
                self.finish_webhook(
                    event_id,
                    external_id,
                    WebhookEventOutcome::Failed,
                    Some(e.to_string()),
                )
                .await;
                return Err(e.into());
            }
        };
        self.finish_webhook(event_id, external_id, applied.outcome.into(), applied.note)
            .await;
        Ok(applied.outcome)
    }

    async fn order_for_payment(&self, event: &PaymentEvent) -> Result<Option<Order>, WebhookError> {
        if let Some(order) = self
            .store
            .order_by_payment_ref(self.gateway.name(), &event.invoice_id)
            .await?
        {
            return Ok(Some(order));
        }
        let Some(order_id) = event.order_id else {
            return Ok(None);
        };
        let order = self
            .store
            .order(order_id)
            .await?
            .filter(|o| o.gateway == self.gateway.name());
        Ok(order)
    }

    /// Apply a gateway-reported invoice state to `order`.
    ///
    /// Shared by webhooks and the reconciler's invoice polling.
    pub(crate) async fn apply_payment(
        &self,
        order: &Order,
        event: &PaymentEvent,
    ) -> Result<Applied, StoreError> {
        let (to, kind, patch) = match &event.status {
            InvoiceStatus::Paid => {
                if let Some(amount) = event.amount.filter(|a| *a != order.total_amount) {
                    warn!(
                        order_id = %order.id,
                        expected = order.total_amount,
                        received = amount,
                        "Paid amount does not match order total"
                    );
                    return Ok(Applied::noted(
                        WebhookOutcome::Ignored,
                        format!(
                            "amount mismatch: expected {}, received {amount}",
                            order.total_amount
                        ),
                    ));
                }
                let patch = OrderPatch {
                    payment_ref: Some(event.invoice_id.clone()),
                    paid_at: Some(event.paid_at.unwrap_or_else(now)),
                    ..Default::default()
                };
                (OrderStatus::Paid, LogKind::PaymentReceived, patch)
            }
            InvoiceStatus::Expired => (
                OrderStatus::Expired,
                LogKind::PaymentExpired,
                OrderPatch::error("Payment window expired"),
            ),
            InvoiceStatus::Failed => (
                OrderStatus::Failed,
                LogKind::PaymentFailed,
                OrderPatch::error("Payment failed"),
            ),
            InvoiceStatus::Pending(raw) => {
                return Ok(Applied::noted(
                    WebhookOutcome::Ignored,
                    format!("non-final invoice status {raw}"),
                ));
            }
        };

        // A late payment never revives an EXPIRED order; the webhook note
        // records it for a manual refund.
        let from: &[OrderStatus] = match to {
            OrderStatus::Paid => OrderStatus::Paid.sources(),
            _ => UNPAID,
        };
        let Some(updated) = self.store.transition(order.id, from, to, patch).await? else {
            return self.already_settled(order, to).await;
        };

        info!(order_id = %updated.id, status = %updated.status, "Payment status applied");
        self.audit(
            updated.id,
            kind,
            json!({
                "invoiceId": event.invoice_id,
                "amount": event.amount,
                "paymentMethod": event.payment_method,
                "eventId": event.event_id,
            }),
        )
        .await;
        if to == OrderStatus::Paid {
            self.enqueue(&updated);
        }
        Ok(Applied::new(WebhookOutcome::Processed))
    }

    async fn already_settled(
        &self,
        order: &Order,
        wanted: OrderStatus,
    ) -> Result<Applied, StoreError> {
        let latest = self.store.order(order.id).await?;
        let current = latest.as_ref().map_or(order.status, |o| o.status);
        let reached = match wanted {
            OrderStatus::Paid => latest.as_ref().is_some_and(|o| o.paid_at.is_some()),
            other => current == other,
        };
        if reached {
            Ok(Applied::new(WebhookOutcome::Duplicate))
        } else {
            warn!(order_id = %order.id, current = %current, wanted = %wanted, "Payment update arrived for a settled order");
            Ok(Applied::noted(
                WebhookOutcome::Ignored,
                format!("order is already {current}"),
            ))
        }
    }
}
