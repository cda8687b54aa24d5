//! Topup provider adapters.
//!
//! Fulfillment and target checks go through [`TopupProvider`]; the concrete
//! adapter is chosen from [`ProviderConfig`] by [`from_config`].

pub mod aggregator;
pub mod mock;
pub mod reseller;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use time::PrimitiveDateTime;
use tkl_sdk::objects::{ResellerCallback, Target};
use tkl_sdk::signature::verify_hex;
use uuid::Uuid;

use crate::config::ProviderConfig;
use crate::utils::http::is_transient_error;

pub use aggregator::AggregatorStub;
pub use mock::{MockOutcome, MockProvider};
pub use reseller::ResellerClient;

/// Header carrying `hex(HMAC-SHA256(body, callback_secret))` on provider callbacks.
pub const CALLBACK_SIGNATURE_HEADER: &str = "X-Callback-Signature";

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network failure, timeout, throttling or upstream 5xx.
    #[error("topup provider unavailable: {0}")]
    Transient(String),
    /// The provider declined; retrying will not help.
    #[error("topup provider rejected the request: {0}")]
    Rejected(String),
    #[error("provider order not found: {0}")]
    NotFound(String),
    #[error("malformed provider payload: {0}")]
    Payload(String),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if is_transient_error(&err) {
            ProviderError::Transient(err.to_string())
        } else if err.is_decode() {
            ProviderError::Payload(err.to_string())
        } else {
            ProviderError::Rejected(err.to_string())
        }
    }
}

/// Provider-side order state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopupStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

impl TopupStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, TopupStatus::Success | TopupStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TopupStatus::Pending => "pending",
            TopupStatus::Processing => "processing",
            TopupStatus::Success => "success",
            TopupStatus::Failed => "failed",
        }
    }

    /// Map the reseller vocabulary. Unknown values are treated as pending.
    pub fn from_reseller(status: &str) -> TopupStatus {
        match status.trim().to_ascii_lowercase().as_str() {
            "success" | "sukses" => TopupStatus::Success,
            "error" | "partial" | "gagal" => TopupStatus::Failed,
            "process" | "processing" => TopupStatus::Processing,
            _ => TopupStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TargetCheck {
    pub valid: bool,
    pub display_name: Option<String>,
    pub error: Option<String>,
}

impl TargetCheck {
    pub fn valid(display_name: Option<String>) -> Self {
        Self {
            valid: true,
            display_name,
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            display_name: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillRequest {
    /// Passed to the provider as its caller reference on every attempt.
    pub order_id: Uuid,
    pub product_code: String,
    pub denomination: String,
    pub target: Target,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillResult {
    pub provider_order_id: String,
    pub status: TopupStatus,
    pub message: Option<String>,
    pub voucher_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOrderStatus {
    pub status: TopupStatus,
    pub message: Option<String>,
    pub voucher_code: Option<String>,
    pub completed_at: Option<PrimitiveDateTime>,
}

/// A status push from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCallback {
    pub provider_order_id: String,
    pub order_id: Option<Uuid>,
    pub status: TopupStatus,
    /// Raw status string as sent by the provider.
    pub raw_status: String,
    pub message: Option<String>,
    pub voucher_code: Option<String>,
}

impl From<ResellerCallback> for ProviderCallback {
    fn from(cb: ResellerCallback) -> Self {
        Self {
            status: TopupStatus::from_reseller(&cb.status),
            order_id: cb.ref_id.as_deref().and_then(|id| Uuid::parse_str(id).ok()),
            provider_order_id: cb.trxid,
            raw_status: cb.status,
            message: cb.note,
            voucher_code: cb.sn.filter(|sn| !sn.trim().is_empty()),
        }
    }
}

/// Rules for authenticating provider callbacks.
///
/// With a secret configured, a valid signature is always required. Without
/// one, callbacks are rejected unless unsigned delivery is explicitly allowed.
#[derive(Debug, Clone, Default)]
pub struct CallbackPolicy {
    pub secret: Option<Box<[u8]>>,
    pub allow_unsigned: bool,
}

impl CallbackPolicy {
    pub fn signed(secret: impl Into<Box<[u8]>>) -> Self {
        Self {
            secret: Some(secret.into()),
            allow_unsigned: false,
        }
    }

    pub fn unsigned() -> Self {
        Self {
            secret: None,
            allow_unsigned: true,
        }
    }

    pub fn verify(&self, signature: Option<&str>, payload: &[u8]) -> bool {
        match (&self.secret, signature) {
            (Some(secret), Some(sig)) => verify_hex(payload, sig, secret).is_ok(),
            (Some(_), None) => false,
            (None, _) => self.allow_unsigned,
        }
    }
}

#[async_trait]
pub trait TopupProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Check a target before checkout. Callers bound this with a timeout.
    async fn verify_target(
        &self,
        product_code: &str,
        target: &Target,
    ) -> Result<TargetCheck, ProviderError>;

    /// Place (or re-place) the order. The provider is idempotent on
    /// `request.order_id`, so repeated calls never double-deliver.
    async fn fulfill(&self, request: FulfillRequest) -> Result<FulfillResult, ProviderError>;

    async fn get_status(&self, provider_order_id: &str)
    -> Result<ProviderOrderStatus, ProviderError>;

    fn callback_policy(&self) -> &CallbackPolicy;

    fn parse_callback(&self, payload: &[u8]) -> Result<ProviderCallback, ProviderError> {
        let callback: ResellerCallback = serde_json::from_slice(payload)
            .map_err(|e| ProviderError::Payload(e.to_string()))?;
        Ok(callback.into())
    }
}

/// Build the configured provider.
pub fn from_config(config: &ProviderConfig) -> Result<Arc<dyn TopupProvider>, reqwest::Error> {
    Ok(match config {
        ProviderConfig::Mock => Arc::new(MockProvider::new()),
        ProviderConfig::Aggregator(cfg) => Arc::new(AggregatorStub::new(cfg.clone())),
        ProviderConfig::Reseller(cfg) => Arc::new(ResellerClient::new(cfg.clone())?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tkl_sdk::signature::hmac_sha256_hex;

    #[test]
    fn reseller_vocabulary() {
        assert_eq!(TopupStatus::from_reseller("success"), TopupStatus::Success);
        assert_eq!(TopupStatus::from_reseller("error"), TopupStatus::Failed);
        assert_eq!(TopupStatus::from_reseller("partial"), TopupStatus::Failed);
        assert_eq!(TopupStatus::from_reseller("process"), TopupStatus::Processing);
        assert_eq!(TopupStatus::from_reseller("waiting"), TopupStatus::Pending);
        assert_eq!(TopupStatus::from_reseller("???"), TopupStatus::Pending);
    }

    #[test]
    fn callback_policy_requires_signature_when_secret_set() {
        let body = br#"{"trxid":"1","status":"success"}"#;
        let sig = hmac_sha256_hex(body, b"cbsecret").unwrap();

        let signed = CallbackPolicy::signed(b"cbsecret".to_vec());
        assert!(signed.verify(Some(&sig), body));
        assert!(!signed.verify(None, body));
        assert!(!signed.verify(Some("00"), body));

        assert!(!CallbackPolicy::default().verify(None, body));
        assert!(CallbackPolicy::unsigned().verify(None, body));
    }
}
