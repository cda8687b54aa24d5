//! Fulfillment attempts and provider status updates.

use std::time::Duration;

use serde_json::json;
use tkl_sdk::objects::WebhookOutcome;
use tracing::{info, warn};

use super::{Orchestrator, OrderError, WebhookError};
use crate::entities::OrderStatus;
use crate::entities::catalog::DeliveryKind;
use crate::entities::order::{Order, OrderPatch};
use crate::entities::transaction_log::LogKind;
use crate::entities::webhook_event::WebhookEventOutcome;
use crate::events::FulfillmentJob;
use crate::providers::{FulfillRequest, TopupStatus};
use crate::store::StoreError;
use crate::utils::backoff::retry_delay;
use crate::utils::clock::now;

const IN_FLIGHT: &[OrderStatus] = &[OrderStatus::Processing];
/// Statuses a provider-side failure may end.
const FAILABLE: &[OrderStatus] = &[OrderStatus::Paid, OrderStatus::Processing];

/// What one fulfillment attempt ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Nothing to do for this job.
    Skipped(&'static str),
    /// The order reached a terminal status.
    Settled(OrderStatus),
    /// The provider accepted the order; completion arrives later.
    InFlight,
    /// Transient failure. Run the next attempt after `delay`.
    Retry { delay: Duration },
}

/// Provider-reported state to apply to an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TopupUpdate {
    pub status: TopupStatus,
    pub provider_order_id: Option<String>,
    pub provider_status: String,
    pub message: Option<String>,
    pub voucher_code: Option<String>,
}

impl Orchestrator {
    /// Run one attempt of `job`.
    ///
    /// The order is re-read first, so stale or repeated jobs are harmless.
    #[tracing::instrument(skip_all, fields(order_id = %job.order_id, attempt = job.attempt))]
    pub async fn run_fulfillment(&self, job: &FulfillmentJob) -> Result<AttemptOutcome, OrderError> {
        let Some(order) = self.store.order(job.order_id).await? else {
            warn!("Fulfillment job for unknown order");
            return Ok(AttemptOutcome::Skipped("order not found"));
        };
        if order.status.is_terminal() {
            return Ok(AttemptOutcome::Skipped("order already settled"));
        }

        let bump = OrderPatch {
            bump_attempts: true,
            ..Default::default()
        };
        let claimed = match order.status {
            OrderStatus::Paid => {
                self.store
                    .transition(order.id, &[OrderStatus::Paid], OrderStatus::Processing, bump)
                    .await?
            }
            // A retry: the provider never accepted the order. The attempts
            // guard lets exactly one copy of a duplicated retry through.
            OrderStatus::Processing if job.attempt > 1 && order.provider_order_id.is_none() => {
                let patch = OrderPatch {
                    expected_attempts: Some(job.attempt as i32 - 1),
                    ..bump
                };
                self.store
                    .transition(
                        order.id,
                        &[OrderStatus::Processing],
                        OrderStatus::Processing,
                        patch,
                    )
                    .await?
            }
            OrderStatus::Processing => return Ok(AttemptOutcome::Skipped("already in progress")),
            _ => return Ok(AttemptOutcome::Skipped("order not paid")),
        };
        let Some(order) = claimed else {
            return Ok(AttemptOutcome::Skipped("claimed by another writer"));
        };
        self.audit(
            order.id,
            LogKind::FulfillmentStarted,
            json!({ "attempt": job.attempt }),
        )
        .await;

        let Some(product) = self.store.product(order.product_id).await? else {
            return self.fail(&order, "Product is no longer available").await;
        };
        let Some(denomination) = self.store.denomination(order.denomination_id).await? else {
            return self.fail(&order, "Denomination is no longer available").await;
        };

        if product.delivery == DeliveryKind::VoucherStock {
            return match self
                .store
                .claim_voucher(denomination.id, order.id)
                .await?
            {
                Some(code) => {
                    info!(order_id = %order.id, "Voucher claimed from stock");
                    self.audit(
                        order.id,
                        LogKind::TopupResult,
                        json!({ "attempt": job.attempt, "status": "success", "source": "voucher_stock" }),
                    )
                    .await;
                    let update = TopupUpdate {
                        status: TopupStatus::Success,
                        provider_order_id: None,
                        provider_status: "voucher_stock".into(),
                        message: None,
                        voucher_code: Some(code),
                    };
                    self.settle_attempt(&order, update).await
                }
                None => self.fail(&order, "Voucher stock exhausted").await,
            };
        }

        let product_code = denomination
            .provider_code
            .clone()
            .or_else(|| product.provider_code.clone())
            .unwrap_or_else(|| product.slug.clone());
        let request = FulfillRequest {
            order_id: order.id,
            product_code,
            denomination: denomination.label.clone(),
            target: order.target.0.clone(),
            customer_email: Some(order.contact_email.clone()),
            customer_phone: Some(order.contact_whatsapp.clone()),
        };

        match self.provider.fulfill(request).await {
            Ok(result) => {
                info!(
                    order_id = %order.id,
                    provider_order_id = %result.provider_order_id,
                    status = result.status.as_str(),
                    "Provider accepted fulfillment"
                );
                self.audit(
                    order.id,
                    LogKind::TopupResult,
                    json!({
                        "attempt": job.attempt,
                        "providerOrderId": result.provider_order_id,
                        "status": result.status.as_str(),
                        "message": result.message,
                    }),
                )
                .await;
                let update = TopupUpdate {
                    status: result.status,
                    provider_order_id: Some(result.provider_order_id),
                    provider_status: result.status.as_str().to_string(),
                    message: result.message,
                    voucher_code: result.voucher_code,
                };
                self.settle_attempt(&order, update).await
            }
            Err(e) => {
                let max_attempts = self.fulfillment.max_attempts.max(1);
                let retry = e.is_retryable() && job.attempt < max_attempts;
                warn!(order_id = %order.id, error = %e, retry, "Fulfillment attempt failed");
                self.audit(
                    order.id,
                    LogKind::TopupResult,
                    json!({
                        "attempt": job.attempt,
                        "error": e.to_string(),
                        "retryable": e.is_retryable(),
                    }),
                )
                .await;
                if retry {
                    return Ok(AttemptOutcome::Retry {
                        delay: retry_delay(self.fulfillment.initial_backoff, job.attempt),
                    });
                }
                let message = if e.is_retryable() {
                    format!("Fulfillment failed after {} attempts: {e}", job.attempt)
                } else {
                    format!("Fulfillment failed: {e}")
                };
                self.fail(&order, &message).await
            }
        }
    }

    async fn settle_attempt(
        &self,
        order: &Order,
        update: TopupUpdate,
    ) -> Result<AttemptOutcome, OrderError> {
        let is_final = update.status.is_final();
        let updated = self.apply_topup(order.id, update).await?;
        if !is_final {
            return Ok(AttemptOutcome::InFlight);
        }
        let status = match updated {
            Some(updated) => updated.status,
            None => self
                .store
                .order(order.id)
                .await?
                .map_or(order.status, |o| o.status),
        };
        Ok(AttemptOutcome::Settled(status))
    }

    async fn fail(&self, order: &Order, message: &str) -> Result<AttemptOutcome, OrderError> {
        let update = TopupUpdate {
            status: TopupStatus::Failed,
            provider_order_id: None,
            provider_status: "failed".into(),
            message: Some(message.to_string()),
            voucher_code: None,
        };
        self.settle_attempt(order, update).await
    }

    /// Apply provider state to an order.
    ///
    /// SUCCESS is only reachable from PROCESSING, so a late success never
    /// overrides a FAILED order.
    pub(crate) async fn apply_topup(
        &self,
        order_id: uuid::Uuid,
        update: TopupUpdate,
    ) -> Result<Option<Order>, StoreError> {
        let (from, to, patch): (&[OrderStatus], OrderStatus, OrderPatch) = match update.status {
            TopupStatus::Success => (
                IN_FLIGHT,
                OrderStatus::Success,
                OrderPatch {
                    provider_order_id: update.provider_order_id,
                    provider_status: Some(update.provider_status),
                    voucher_code: update.voucher_code,
                    success_at: Some(now()),
                    ..Default::default()
                },
            ),
            TopupStatus::Failed => (
                FAILABLE,
                OrderStatus::Failed,
                OrderPatch {
                    provider_order_id: update.provider_order_id,
                    provider_status: Some(update.provider_status),
                    error_message: Some(
                        update
                            .message
                            .unwrap_or_else(|| "Topup failed at provider".into()),
                    ),
                    ..Default::default()
                },
            ),
            TopupStatus::Pending | TopupStatus::Processing => (
                IN_FLIGHT,
                OrderStatus::Processing,
                OrderPatch {
                    provider_order_id: update.provider_order_id,
                    provider_status: Some(update.provider_status),
                    ..Default::default()
                },
            ),
        };
        let updated = self.store.transition(order_id, from, to, patch).await?;
        if let Some(order) = &updated {
            if to != OrderStatus::Processing {
                info!(order_id = %order.id, status = %order.status, "Fulfillment settled");
            }
        }
        Ok(updated)
    }

    /// Authenticate, parse and apply a provider status callback.
    #[tracing::instrument(skip_all, fields(provider = self.provider.name()))]
    pub async fn handle_provider_callback(
        &self,
        signature: Option<&str>,
        payload: &[u8],
    ) -> Result<WebhookOutcome, WebhookError> {
        let source = format!("provider:{}", self.provider.name());
        let event_id = self.record_webhook(source, signature, payload).await?;

        if !self.provider.callback_policy().verify(signature, payload) {
            warn!(webhook_event_id = event_id, "Provider callback signature rejected");
            self.finish_webhook(
                event_id,
                None,
                WebhookEventOutcome::Rejected,
                Some("invalid signature".into()),
            )
            .await;
            return Err(WebhookError::InvalidSignature);
        }

        let callback = match self.provider.parse_callback(payload) {
            Ok(callback) => callback,
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
        let external_id = Some(callback.provider_order_id.clone());

        let mut order = self
            .store
            .order_by_provider_order_id(&callback.provider_order_id)
            .await?;
        if order.is_none() {
            if let Some(order_id) = callback.order_id {
                order = self.store.order(order_id).await?;
            }
        }
        let Some(order) = order else {
            warn!(provider_order_id = %callback.provider_order_id, "Provider callback for unknown order");
            self.finish_webhook(
                event_id,
                external_id,
                WebhookEventOutcome::Failed,
                Some("order not found".into()),
            )
            .await;
            return Err(WebhookError::OrderNotFound);
        };

        self.audit(
            order.id,
            LogKind::ProviderCallback,
            json!({
                "providerOrderId": callback.provider_order_id,
                "status": callback.raw_status,
                "message": callback.message,
            }),
        )
        .await;

        let wanted = callback.status;
        let update = TopupUpdate {
            status: callback.status,
            provider_order_id: Some(callback.provider_order_id),
            provider_status: callback.raw_status,
            message: callback.message,
            voucher_code: callback.voucher_code,
        };
        let (outcome, note) = match self.apply_topup(order.id, update).await {
            Ok(Some(_)) => (WebhookOutcome::Processed, None),
            Ok(None) => {
                let current = self
                    .store
                    .order(order.id)
                    .await?
                    .map_or(order.status, |o| o.status);
                let same = matches!(
                    (wanted, current),
                    (TopupStatus::Success, OrderStatus::Success)
                        | (TopupStatus::Failed, OrderStatus::Failed)
                );
                if same {
                    (WebhookOutcome::Duplicate, None)
                } else {
                    (
                        WebhookOutcome::Ignored,
                        Some(format!("order is {current}, provider says {}", wanted.as_str())),
                    )
                }
            }
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
        self.finish_webhook(event_id, external_id, outcome.into(), note)
            .await;
        Ok(outcome)
    }
}
