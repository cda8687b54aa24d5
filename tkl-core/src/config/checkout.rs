//! Checkout configuration.

use std::time::Duration;

use url::Url;

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Prefix of customer-facing order codes, e.g. `TKL`.
    pub code_prefix: String,
    /// Lifetime requested for new invoices.
    pub invoice_ttl: Duration,
    /// Where the gateway sends the customer after paying.
    pub success_redirect_url: Url,
    /// Where the gateway sends the customer after a failed payment.
    pub failure_redirect_url: Url,
    /// Width of the time bucket folded into derived idempotency keys.
    pub idempotency_bucket: Duration,
    /// Upper bound on a provider target lookup.
    pub target_verify_timeout: Duration,
}

impl CheckoutConfig {
    /// Defaults pointing at a local storefront, used by tests.
    pub fn local() -> Result<Self, url::ParseError> {
        let base = Url::parse("http://localhost:3000/")?;
        Ok(Self {
            code_prefix: "TKL".into(),
            invoice_ttl: Duration::from_secs(60 * 60),
            success_redirect_url: base.join("orders/success")?,
            failure_redirect_url: base.join("orders/failed")?,
            idempotency_bucket: Duration::from_secs(10 * 60),
            target_verify_timeout: Duration::from_secs(5),
        })
    }

    /// Redirect URL carrying the order code so the storefront can show it.
    pub fn redirect_for(&self, base: &Url, order_code: &str) -> String {
        let mut url = base.clone();
        url.query_pairs_mut().append_pair("code", order_code);
        url.to_string()
    }
}
