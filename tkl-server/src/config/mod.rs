//! Configuration module for tkl-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables, and turns it into the runtime types
//! owned by `tkl-core`.

pub mod file;

use crate::config::file::{
    CheckoutConfig as FileCheckoutConfig, FileConfig,
    FulfillmentConfig as FileFulfillmentConfig, PaymentConfig as FilePaymentConfig,
    ProviderConfig as FileProviderConfig,
};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tkl_core::config::{
    AggregatorConfig, CheckoutConfig, CoreConfig, FulfillmentConfig, MockGatewayConfig,
    PaymentConfig, ProviderConfig, ResellerConfig, TripayConfig, XenditConfig,
};
use url::Url;

const XENDIT_API_BASE: &str = "https://api.xendit.co/";
const TRIPAY_API_BASE: &str = "https://tripay.co.id/api/";
/// Upper bound for target verification, which runs inside a customer request.
const MAX_TARGET_VERIFY_TIMEOUT_MS: u64 = 5_000;
/// Upper bound for gateway and provider request timeouts.
const MAX_HTTP_TIMEOUT_MS: u64 = 60_000;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("invalid URL in config: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Server-only settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub public_base_url: Url,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub core: CoreConfig,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Read the TOML file, apply CLI overrides, validate and convert.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        build_loaded_config(file_config)
    }
}

/// Validate a parsed file and convert it into runtime configuration.
pub fn build_loaded_config(file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
    validate(&file_config)?;

    let public_base_url = file_config.server.public_base_url;
    let checkout = convert_checkout(file_config.checkout, &public_base_url)?;
    let fulfillment = convert_fulfillment(file_config.fulfillment);
    let payment = convert_payment(file_config.payment, &public_base_url)?;
    let provider = convert_provider(file_config.provider);

    Ok(LoadedConfig {
        server: ServerConfig {
            listen: file_config.server.listen,
            public_base_url,
        },
        core: CoreConfig {
            checkout,
            fulfillment,
            payment,
            provider,
        },
    })
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    let prefix = &config.checkout.code_prefix;
    if prefix.is_empty()
        || prefix.len() > 8
        || !prefix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(ConfigError::ValidationError(format!(
            "checkout.code_prefix must be 1-8 uppercase letters or digits, got {prefix:?}"
        )));
    }
    if config.checkout.invoice_ttl_minutes == 0 {
        return Err(ConfigError::ValidationError(
            "checkout.invoice_ttl_minutes must be positive".into(),
        ));
    }
    if config.fulfillment.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "fulfillment.max_attempts must be at least 1".into(),
        ));
    }
    if config.fulfillment.concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "fulfillment.concurrency must be at least 1".into(),
        ));
    }
    if config.fulfillment.sweep_interval_seconds == 0 || config.fulfillment.sweep_batch <= 0 {
        return Err(ConfigError::ValidationError(
            "fulfillment sweep interval and batch must be positive".into(),
        ));
    }

    let verify_timeout = config.checkout.target_verify_timeout_ms;
    if verify_timeout == 0 || verify_timeout > MAX_TARGET_VERIFY_TIMEOUT_MS {
        return Err(ConfigError::ValidationError(format!(
            "checkout.target_verify_timeout_ms must be 1-{MAX_TARGET_VERIFY_TIMEOUT_MS}, got {verify_timeout}"
        )));
    }
    let payment_timeout = match &config.payment {
        FilePaymentConfig::Mock { .. } => None,
        FilePaymentConfig::Xendit { timeout_ms, .. }
        | FilePaymentConfig::Tripay { timeout_ms, .. } => Some(("payment", *timeout_ms)),
    };
    let provider_timeout = match &config.provider {
        FileProviderConfig::Reseller { timeout_ms, .. } => Some(("provider", *timeout_ms)),
        _ => None,
    };
    for (section, timeout_ms) in payment_timeout.into_iter().chain(provider_timeout) {
        if timeout_ms == 0 || timeout_ms > MAX_HTTP_TIMEOUT_MS {
            return Err(ConfigError::ValidationError(format!(
                "{section}.timeout_ms must be 1-{MAX_HTTP_TIMEOUT_MS}, got {timeout_ms}"
            )));
        }
    }

    let empty_secret = match &config.payment {
        FilePaymentConfig::Mock { webhook_secret } => webhook_secret.is_empty(),
        FilePaymentConfig::Xendit {
            secret_key,
            callback_token,
            ..
        } => secret_key.is_empty() || callback_token.is_empty(),
        FilePaymentConfig::Tripay {
            api_key,
            private_key,
            ..
        } => api_key.is_empty() || private_key.is_empty(),
    };
    if empty_secret {
        return Err(ConfigError::ValidationError(
            "payment credentials must not be empty".into(),
        ));
    }

    if let FileProviderConfig::Reseller {
        callback_secret,
        allow_unsigned_callbacks,
        ..
    } = &config.provider
    {
        if callback_secret.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::ValidationError(
                "provider.callback_secret must not be empty when set".into(),
            ));
        }
        if callback_secret.is_none() && !allow_unsigned_callbacks {
            tracing::warn!(
                "No provider callback secret configured; reseller callbacks will be rejected"
            );
        }
    }
    Ok(())
}

fn convert_checkout(
    c: FileCheckoutConfig,
    public_base_url: &Url,
) -> Result<CheckoutConfig, ConfigError> {
    let success_redirect_url = match c.success_redirect_url {
        Some(url) => url,
        None => public_base_url.join("orders/success")?,
    };
    let failure_redirect_url = match c.failure_redirect_url {
        Some(url) => url,
        None => public_base_url.join("orders/failed")?,
    };
    Ok(CheckoutConfig {
        code_prefix: c.code_prefix,
        invoice_ttl: Duration::from_secs(c.invoice_ttl_minutes * 60),
        success_redirect_url,
        failure_redirect_url,
        idempotency_bucket: Duration::from_secs(c.idempotency_bucket_seconds.max(1)),
        target_verify_timeout: Duration::from_millis(c.target_verify_timeout_ms),
    })
}

fn convert_fulfillment(f: FileFulfillmentConfig) -> FulfillmentConfig {
    FulfillmentConfig {
        max_attempts: f.max_attempts,
        concurrency: f.concurrency,
        initial_backoff: Duration::from_secs(f.initial_backoff_seconds),
        stuck_after: Duration::from_secs(f.stuck_after_seconds),
        requeue_paid_after: Duration::from_secs(f.requeue_paid_after_seconds),
        sweep_interval: Duration::from_secs(f.sweep_interval_seconds),
        sweep_batch: f.sweep_batch,
    }
}

fn convert_payment(
    p: FilePaymentConfig,
    public_base_url: &Url,
) -> Result<PaymentConfig, ConfigError> {
    Ok(match p {
        FilePaymentConfig::Mock { webhook_secret } => PaymentConfig::Mock(MockGatewayConfig {
            public_base_url: public_base_url.clone(),
            webhook_secret: webhook_secret.into_bytes().into_boxed_slice(),
        }),
        FilePaymentConfig::Xendit {
            api_base,
            secret_key,
            callback_token,
            timeout_ms,
        } => PaymentConfig::Xendit(XenditConfig {
            api_base: api_base.map_or_else(|| Url::parse(XENDIT_API_BASE), Ok)?,
            secret_key,
            callback_token,
            timeout: Duration::from_millis(timeout_ms),
        }),
        FilePaymentConfig::Tripay {
            api_base,
            api_key,
            private_key,
            merchant_code,
            timeout_ms,
        } => PaymentConfig::Tripay(TripayConfig {
            api_base: api_base.map_or_else(|| Url::parse(TRIPAY_API_BASE), Ok)?,
            api_key,
            private_key,
            merchant_code,
            timeout: Duration::from_millis(timeout_ms),
        }),
    })
}

fn convert_provider(p: FileProviderConfig) -> ProviderConfig {
    match p {
        FileProviderConfig::Mock => ProviderConfig::Mock,
        FileProviderConfig::Aggregator {
            settle_after_seconds,
        } => ProviderConfig::Aggregator(AggregatorConfig {
            settle_after: Duration::from_secs(settle_after_seconds),
        }),
        FileProviderConfig::Reseller {
            base_url,
            username,
            api_key,
            callback_secret,
            allow_unsigned_callbacks,
            timeout_ms,
        } => ProviderConfig::Reseller(ResellerConfig {
            base_url,
            username,
            api_key,
            callback_secret: callback_secret.map(|s| s.into_bytes().into_boxed_slice()),
            allow_unsigned_callbacks,
            timeout: Duration::from_millis(timeout_ms),
        }),
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> FileConfig {
        toml::from_str(toml_str).unwrap()
    }

    const MINIMAL: &str = r#"
[server]
public_base_url = "https://shop.example.com/"

[payment]
kind = "mock"
webhook_secret = "whsec_local"
"#;

    #[test]
    fn test_defaults_are_resolved_against_public_url() {
        let loaded = build_loaded_config(parse(MINIMAL)).unwrap();
        assert_eq!(
            loaded.core.checkout.success_redirect_url.as_str(),
            "https://shop.example.com/orders/success"
        );
        assert_eq!(
            loaded.core.checkout.failure_redirect_url.as_str(),
            "https://shop.example.com/orders/failed"
        );
        assert_eq!(loaded.core.checkout.invoice_ttl, Duration::from_secs(3600));
        assert_eq!(loaded.core.fulfillment.max_attempts, 3);
        assert_eq!(loaded.core.fulfillment.initial_backoff, Duration::from_secs(2));
        assert_eq!(loaded.core.payment.name(), "mock");
        assert_eq!(loaded.core.provider.name(), "mock");
        match loaded.core.payment {
            PaymentConfig::Mock(cfg) => {
                assert_eq!(cfg.public_base_url.as_str(), "https://shop.example.com/");
                assert_eq!(&*cfg.webhook_secret, b"whsec_local");
            }
            other => panic!("unexpected payment config: {other:?}"),
        }
    }

    #[test]
    fn test_gateway_api_base_defaults() {
        let loaded = build_loaded_config(parse(
            r#"
[server]
public_base_url = "https://shop.example.com/"

[payment]
kind = "xendit"
secret_key = "xnd_secret"
callback_token = "cb"
"#,
        ))
        .unwrap();
        match loaded.core.payment {
            PaymentConfig::Xendit(cfg) => {
                assert_eq!(cfg.api_base.as_str(), XENDIT_API_BASE);
                assert_eq!(cfg.timeout, Duration::from_secs(10));
            }
            other => panic!("unexpected payment config: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_code_prefix_rejected() {
        let mut config = parse(MINIMAL);
        config.checkout.code_prefix = "tk-l".into();
        assert!(matches!(
            build_loaded_config(config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = parse(MINIMAL);
        config.fulfillment.max_attempts = 0;
        assert!(matches!(
            build_loaded_config(config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_out_of_range_timeouts_rejected() {
        let mut config = parse(MINIMAL);
        config.checkout.target_verify_timeout_ms = 5_001;
        assert!(matches!(
            build_loaded_config(config),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = parse(
            r#"
[server]
public_base_url = "https://shop.example.com/"

[payment]
kind = "xendit"
secret_key = "xnd_secret"
callback_token = "cb"
timeout_ms = 0
"#,
        );
        assert!(matches!(
            build_loaded_config(config.clone()),
            Err(ConfigError::ValidationError(_))
        ));
        if let FilePaymentConfig::Xendit { timeout_ms, .. } = &mut config.payment {
            *timeout_ms = 5_000;
        }
        assert!(build_loaded_config(config).is_ok());
    }

    #[test]
    fn test_empty_webhook_secret_rejected() {
        let mut config = parse(MINIMAL);
        config.payment = FilePaymentConfig::Mock {
            webhook_secret: String::new(),
        };
        assert!(matches!(
            build_loaded_config(config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_reseller_callback_secret_converted() {
        let loaded = build_loaded_config(parse(
            r#"
[server]
public_base_url = "https://shop.example.com/"

[payment]
kind = "mock"
webhook_secret = "whsec_local"

[provider]
kind = "reseller"
base_url = "https://reseller.example.com/api/"
username = "shop"
api_key = "key"
callback_secret = "cb-secret"
"#,
        ))
        .unwrap();
        match loaded.core.provider {
            ProviderConfig::Reseller(cfg) => {
                assert_eq!(cfg.callback_secret.as_deref(), Some(&b"cb-secret"[..]));
                assert!(!cfg.allow_unsigned_callbacks);
            }
            other => panic!("unexpected provider config: {other:?}"),
        }
    }

    #[test]
    fn test_load_applies_listen_override() {
        let dir = std::env::temp_dir().join(format!("tkl-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tkl-config.toml");
        std::fs::write(&path, MINIMAL).unwrap();

        let listen: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        let loaded = ConfigLoader::new(&path, Some(listen)).load().unwrap();
        assert_eq!(loaded.server.listen, listen);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let loader = ConfigLoader::new("/nonexistent/tkl-config.toml", None);
        assert!(matches!(loader.load(), Err(ConfigError::IoError(_))));
    }
}
