//! Payment gateway selection.

use std::time::Duration;

use url::Url;

/// Which payment gateway to talk to, resolved once at startup.
#[derive(Debug, Clone)]
pub enum PaymentConfig {
    Mock(MockGatewayConfig),
    Xendit(XenditConfig),
    Tripay(TripayConfig),
}

impl PaymentConfig {
    pub fn name(&self) -> &'static str {
        match self {
            PaymentConfig::Mock(_) => "mock",
            PaymentConfig::Xendit(_) => "xendit",
            PaymentConfig::Tripay(_) => "tripay",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockGatewayConfig {
    /// Base of the fake hosted checkout pages.
    pub public_base_url: Url,
    /// HMAC secret for the `X-Signature` webhook header.
    pub webhook_secret: Box<[u8]>,
}

#[derive(Debug, Clone)]
pub struct XenditConfig {
    pub api_base: Url,
    pub secret_key: String,
    /// Value Xendit puts in `x-callback-token`.
    pub callback_token: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct TripayConfig {
    pub api_base: Url,
    pub api_key: String,
    pub private_key: String,
    pub merchant_code: String,
    pub timeout: Duration,
}
