//! Inbound webhook payloads and acknowledgements.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::signature::Signature;

/// Event names emitted by the mock payment gateway.
pub const INVOICE_PAID: &str = "invoice.paid";
pub const INVOICE_EXPIRED: &str = "invoice.expired";
pub const INVOICE_FAILED: &str = "invoice.failed";

/// Webhook body posted by the mock payment gateway.
///
/// `event` is left as a string so the receiving side decides how to treat
/// names it does not know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockPaymentWebhook {
    pub event: String,
    pub invoice_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    pub amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    /// Unix timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<i64>,
}

impl Signature for MockPaymentWebhook {}

/// Status callback posted by the topup reseller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResellerCallback {
    /// Reseller-side transaction id.
    pub trxid: String,
    /// Our order id, echoed back.
    #[serde(default)]
    pub ref_id: Option<String>,
    /// One of `success`, `error`, `partial`, `process`, `waiting`.
    pub status: String,
    #[serde(default)]
    pub note: Option<String>,
    /// Serial number / voucher code on success.
    #[serde(default)]
    pub sn: Option<String>,
}

/// How a webhook was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// The event moved the order forward.
    Processed,
    /// The order was already at or past the state the event describes.
    Duplicate,
    /// The event carried nothing actionable.
    Ignored,
}

/// Body returned to webhook senders on 200.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub ok: bool,
    pub outcome: WebhookOutcome,
}

impl From<WebhookOutcome> for WebhookAck {
    fn from(outcome: WebhookOutcome) -> Self {
        Self { ok: true, outcome }
    }
}
