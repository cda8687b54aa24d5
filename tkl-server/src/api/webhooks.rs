//! Inbound webhook handlers.
//!
//! - `POST /webhooks/payment`  – payment gateway notification; the signature
//!   header depends on the configured gateway.
//! - `POST /webhooks/provider` – topup provider status callback, signed with
//!   `X-Callback-Signature`.
//!
//! Both answer 200 with a [`WebhookAck`] once the event has been applied,
//! recognised as a duplicate, or deliberately ignored.

use axum::{Json, extract::State};
use tkl_core::providers::CALLBACK_SIGNATURE_HEADER;
use tkl_sdk::objects::WebhookAck;

use crate::api::error::ApiError;
use crate::api::extractors::RawWebhook;
use crate::state::AppState;

/// `POST /webhooks/payment`
pub(crate) async fn payment_webhook(
    State(state): State<AppState>,
    webhook: RawWebhook,
) -> Result<Json<WebhookAck>, ApiError> {
    let header = state.orchestrator.gateway().signature_header();
    let outcome = state
        .orchestrator
        .handle_payment_webhook(webhook.header(header), &webhook.body)
        .await?;
    Ok(Json(outcome.into()))
}

/// `POST /webhooks/provider`
pub(crate) async fn provider_callback(
    State(state): State<AppState>,
    webhook: RawWebhook,
) -> Result<Json<WebhookAck>, ApiError> {
    let outcome = state
        .orchestrator
        .handle_provider_callback(webhook.header(CALLBACK_SIGNATURE_HEADER), &webhook.body)
        .await?;
    Ok(Json(outcome.into()))
}
