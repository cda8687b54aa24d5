//! Topup provider selection.

use std::time::Duration;

use url::Url;

/// Which topup provider fulfils orders, resolved once at startup.
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    Mock,
    Aggregator(AggregatorConfig),
    Reseller(ResellerConfig),
}

impl ProviderConfig {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderConfig::Mock => "mock",
            ProviderConfig::Aggregator(_) => "aggregator",
            ProviderConfig::Reseller(_) => "reseller",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// How long an accepted order stays `processing` before it reports success.
    pub settle_after: Duration,
}

#[derive(Debug, Clone)]
pub struct ResellerConfig {
    pub base_url: Url,
    pub username: String,
    pub api_key: String,
    /// Secret for the callback signature header.
    pub callback_secret: Option<Box<[u8]>>,
    /// Accept unsigned callbacks when no secret is configured.
    pub allow_unsigned_callbacks: bool,
    pub timeout: Duration,
}
