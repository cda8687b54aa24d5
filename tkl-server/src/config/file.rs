//! TOML file configuration structures.
//!
//! These structs directly map to the `tkl-config.toml` file format.

use serde::Deserialize;
use std::net::SocketAddr;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub checkout: CheckoutConfig,
    #[serde(default)]
    pub fulfillment: FulfillmentConfig,
    pub payment: PaymentConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
    /// Public base URL of this server, used for hosted mock checkout pages.
    pub public_base_url: Url,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    pub code_prefix: String,
    pub invoice_ttl_minutes: u64,
    /// Storefront page the gateway redirects to after payment. Defaults to
    /// `{public_base_url}/orders/success`.
    pub success_redirect_url: Option<Url>,
    pub failure_redirect_url: Option<Url>,
    pub idempotency_bucket_seconds: u64,
    pub target_verify_timeout_ms: u64,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            code_prefix: "TKL".into(),
            invoice_ttl_minutes: 60,
            success_redirect_url: None,
            failure_redirect_url: None,
            idempotency_bucket_seconds: 600,
            target_verify_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FulfillmentConfig {
    pub max_attempts: u32,
    pub concurrency: usize,
    pub initial_backoff_seconds: u64,
    pub stuck_after_seconds: u64,
    pub requeue_paid_after_seconds: u64,
    pub sweep_interval_seconds: u64,
    pub sweep_batch: i64,
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            concurrency: 4,
            initial_backoff_seconds: 2,
            stuck_after_seconds: 3_600,
            requeue_paid_after_seconds: 120,
            sweep_interval_seconds: 60,
            sweep_batch: 100,
        }
    }
}

/// `[payment]` section, selected by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentConfig {
    Mock {
        webhook_secret: String,
    },
    Xendit {
        /// Defaults to the public Xendit API.
        #[serde(default)]
        api_base: Option<Url>,
        secret_key: String,
        callback_token: String,
        #[serde(default = "default_http_timeout_ms")]
        timeout_ms: u64,
    },
    Tripay {
        /// Defaults to the Tripay production API.
        #[serde(default)]
        api_base: Option<Url>,
        api_key: String,
        private_key: String,
        merchant_code: String,
        #[serde(default = "default_http_timeout_ms")]
        timeout_ms: u64,
    },
}

/// `[provider]` section, selected by `kind`. Defaults to the mock provider.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderConfig {
    #[default]
    Mock,
    Aggregator {
        #[serde(default = "default_settle_after_seconds")]
        settle_after_seconds: u64,
    },
    Reseller {
        base_url: Url,
        username: String,
        api_key: String,
        #[serde(default)]
        callback_secret: Option<String>,
        #[serde(default)]
        allow_unsigned_callbacks: bool,
        #[serde(default = "default_http_timeout_ms")]
        timeout_ms: u64,
    },
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

fn default_settle_after_seconds() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"
public_base_url = "https://shop.example.com/"

[payment]
kind = "mock"
webhook_secret = "whsec_local"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.checkout.code_prefix, "TKL");
        assert_eq!(config.fulfillment.max_attempts, 3);
        assert_eq!(config.fulfillment.initial_backoff_seconds, 2);
        assert!(matches!(config.payment, PaymentConfig::Mock { .. }));
        assert!(matches!(config.provider, ProviderConfig::Mock));
    }

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
public_base_url = "https://shop.example.com/"

[checkout]
code_prefix = "TOP"
invoice_ttl_minutes = 30
success_redirect_url = "https://shop.example.com/thanks"

[fulfillment]
max_attempts = 5
concurrency = 8

[payment]
kind = "tripay"
api_key = "key"
private_key = "private"
merchant_code = "T0001"

[provider]
kind = "reseller"
base_url = "https://reseller.example.com/api/"
username = "shop"
api_key = "reseller-key"
callback_secret = "cb-secret"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, default_listen_addr());
        assert_eq!(config.checkout.code_prefix, "TOP");
        assert_eq!(config.checkout.invoice_ttl_minutes, 30);
        assert_eq!(config.checkout.idempotency_bucket_seconds, 600);
        assert_eq!(config.fulfillment.max_attempts, 5);
        assert_eq!(config.fulfillment.sweep_interval_seconds, 60);
        match config.payment {
            PaymentConfig::Tripay {
                api_base,
                timeout_ms,
                ..
            } => {
                assert!(api_base.is_none());
                assert_eq!(timeout_ms, 10_000);
            }
            other => panic!("unexpected payment config: {other:?}"),
        }
        match config.provider {
            ProviderConfig::Reseller {
                callback_secret,
                allow_unsigned_callbacks,
                ..
            } => {
                assert_eq!(callback_secret.as_deref(), Some("cb-secret"));
                assert!(!allow_unsigned_callbacks);
            }
            other => panic!("unexpected provider config: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_payment_kind_is_rejected() {
        let toml_str = r#"
[server]
public_base_url = "https://shop.example.com/"

[payment]
kind = "paypal"
"#;
        assert!(toml::from_str::<FileConfig>(toml_str).is_err());
    }
}
