//! Payment gateway adapters.
//!
//! The orchestrator only sees [`PaymentGateway`]. Which implementation backs
//! it is decided once from [`PaymentConfig`] by [`from_config`].

pub mod mock;
pub mod tripay;
pub mod xendit;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::config::PaymentConfig;
use crate::utils::http::{is_transient_error, is_transient_status};

pub use mock::MockGateway;
pub use tripay::TripayGateway;
pub use xendit::XenditGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network failure, timeout, throttling or upstream 5xx.
    #[error("payment gateway unavailable: {0}")]
    Transient(String),
    /// The gateway refused the request; retrying will not help.
    #[error("payment gateway rejected the request: {0}")]
    Rejected(String),
    #[error("invoice not found: {0}")]
    InvoiceNotFound(String),
    /// A webhook or response body could not be understood.
    #[error("malformed gateway payload: {0}")]
    Payload(String),
}

impl GatewayError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transient(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if is_transient_error(&err) {
            GatewayError::Transient(err.to_string())
        } else if err.is_decode() {
            GatewayError::Payload(err.to_string())
        } else {
            GatewayError::Rejected(err.to_string())
        }
    }
}

/// Data the gateway needs to open an invoice for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceRequest {
    /// Used as the gateway-side external reference, so repeated calls for the
    /// same order address the same invoice.
    pub order_id: Uuid,
    pub order_code: String,
    pub amount: i64,
    pub customer_email: String,
    pub customer_phone: String,
    pub description: String,
    pub payment_method: String,
    pub success_redirect_url: String,
    pub failure_redirect_url: String,
    pub ttl: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    pub invoice_id: String,
    pub checkout_url: Option<String>,
    pub qr_string: Option<String>,
    pub expires_at: Option<PrimitiveDateTime>,
    pub payment_instructions: Vec<String>,
}

/// Invoice state in the closed vocabulary used by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceStatus {
    Paid,
    Expired,
    Failed,
    /// Anything else the gateway reports. Never acted upon.
    Pending(String),
}

impl InvoiceStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, InvoiceStatus::Pending(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    pub status: InvoiceStatus,
    pub invoice_id: String,
    pub order_id: Option<Uuid>,
    pub amount: Option<i64>,
    pub payment_method: Option<String>,
    pub paid_at: Option<PrimitiveDateTime>,
    /// Gateway-side id of the notification, when it has one.
    pub event_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDetails {
    pub invoice_id: String,
    pub status: InvoiceStatus,
    pub amount: Option<i64>,
    pub paid_at: Option<PrimitiveDateTime>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Stable name stored on orders, e.g. `xendit`.
    fn name(&self) -> &'static str;

    /// Header carrying the webhook signature or token.
    fn signature_header(&self) -> &'static str;

    async fn create_invoice(&self, request: InvoiceRequest) -> Result<Invoice, GatewayError>;

    /// Authenticate a webhook body. A missing signature or an unconfigured
    /// secret never verifies.
    fn verify_webhook(&self, signature: Option<&str>, payload: &[u8]) -> bool;

    fn parse_event(&self, payload: &[u8]) -> Result<PaymentEvent, GatewayError>;

    async fn get_invoice(&self, invoice_id: &str) -> Result<InvoiceDetails, GatewayError>;
}

/// Build the configured gateway.
pub fn from_config(config: &PaymentConfig) -> Result<Arc<dyn PaymentGateway>, reqwest::Error> {
    Ok(match config {
        PaymentConfig::Mock(cfg) => Arc::new(MockGateway::new(cfg.clone())),
        PaymentConfig::Xendit(cfg) => Arc::new(XenditGateway::new(cfg.clone())?),
        PaymentConfig::Tripay(cfg) => Arc::new(TripayGateway::new(cfg.clone())?),
    })
}

/// Decode a JSON response, classifying non-2xx statuses.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Payload(e.to_string()));
    }
    let body = response.text().await.unwrap_or_default();
    let message = format!("HTTP {}: {}", status.as_u16(), truncate(&body, 256));
    if status == reqwest::StatusCode::NOT_FOUND {
        Err(GatewayError::InvoiceNotFound(message))
    } else if is_transient_status(status) {
        Err(GatewayError::Transient(message))
    } else {
        Err(GatewayError::Rejected(message))
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pub(crate) fn parse_json<T: DeserializeOwned>(payload: &[u8]) -> Result<T, GatewayError> {
    serde_json::from_slice(payload).map_err(|e| GatewayError::Payload(e.to_string()))
}
