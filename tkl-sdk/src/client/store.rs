//! Storefront API client (checkout frontend → storefront server).

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::objects::{
    CheckoutResponse, CreateOrderRequest, OrderView, PriceBreakdown, QuoteRequest,
    ResumeCheckoutRequest, VerifyTargetRequest, VerifyTargetResponse,
};
use crate::signature::IDEMPOTENCY_KEY_HEADER;

/// Typed HTTP client for the storefront order API.
#[derive(Debug, Clone)]
pub struct StoreClient {
    http: Client,
    base_url: Url,
}

impl StoreClient {
    /// Create a new `StoreClient` rooted at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /orders/quote` – price preview.
    pub async fn quote(&self, request: &QuoteRequest) -> Result<PriceBreakdown, ClientError> {
        let url = self.base_url.join("/orders/quote")?;
        let resp = self.http.post(url).json(request).send().await?;
        parse_response(resp).await
    }

    /// `POST /orders` – place an order and obtain payment details.
    ///
    /// Passing the same `idempotency_key` on a retry returns the original
    /// order instead of creating a new one.
    pub async fn create_order(
        &self,
        request: &CreateOrderRequest,
        idempotency_key: Option<&str>,
    ) -> Result<CheckoutResponse, ClientError> {
        let url = self.base_url.join("/orders")?;
        let mut builder = self.http.post(url).json(request);
        if let Some(key) = idempotency_key {
            builder = builder.header(IDEMPOTENCY_KEY_HEADER, key);
        }
        let resp = builder.send().await?;
        parse_response(resp).await
    }

    /// `GET /orders?code=&email=` – look up an order.
    pub async fn lookup_order(&self, code: &str, email: &str) -> Result<OrderView, ClientError> {
        let mut url = self.base_url.join("/orders")?;
        url.set_query(Some(&format!(
            "code={}&email={}",
            urlencoding::encode(code),
            urlencoding::encode(email)
        )));
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `POST /orders/resume` – reissue or fetch payment details for an
    /// unpaid order.
    pub async fn resume_checkout(
        &self,
        code: &str,
        email: &str,
    ) -> Result<CheckoutResponse, ClientError> {
        let url = self.base_url.join("/orders/resume")?;
        let body = ResumeCheckoutRequest {
            code: code.to_owned(),
            email: email.to_owned(),
        };
        let resp = self.http.post(url).json(&body).send().await?;
        parse_response(resp).await
    }

    /// `POST /targets/verify` – validate a destination before checkout.
    pub async fn verify_target(
        &self,
        request: &VerifyTargetRequest,
    ) -> Result<VerifyTargetResponse, ClientError> {
        let url = self.base_url.join("/targets/verify")?;
        let resp = self.http.post(url).json(request).send().await?;
        parse_response(resp).await
    }
}
