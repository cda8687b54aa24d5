//! Configuration types for the storefront core.
//!
//! These types represent the validated runtime configuration. The actual
//! config loading/parsing is handled by the server crate.

mod checkout;
mod fulfillment;
mod payment;
mod provider;

pub use checkout::CheckoutConfig;
pub use fulfillment::FulfillmentConfig;
pub use payment::{MockGatewayConfig, PaymentConfig, TripayConfig, XenditConfig};
pub use provider::{AggregatorConfig, ProviderConfig, ResellerConfig};

/// Everything the orchestrator and background processors need.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub checkout: CheckoutConfig,
    pub fulfillment: FulfillmentConfig,
    pub payment: PaymentConfig,
    pub provider: ProviderConfig,
}
