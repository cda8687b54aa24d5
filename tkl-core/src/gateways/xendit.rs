//! Xendit hosted invoices.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tkl_sdk::signature::verify_token;
use uuid::Uuid;

use super::{
    GatewayError, Invoice, InvoiceDetails, InvoiceRequest, InvoiceStatus, PaymentEvent,
    PaymentGateway, parse_json, read_json,
};
use crate::config::XenditConfig;
use crate::utils::http::client_with_timeout;

pub const CALLBACK_TOKEN_HEADER: &str = "x-callback-token";

#[derive(Debug, Serialize)]
struct CreateInvoiceBody<'a> {
    external_id: String,
    amount: i64,
    payer_email: &'a str,
    description: &'a str,
    invoice_duration: u64,
    success_redirect_url: &'a str,
    failure_redirect_url: &'a str,
    currency: &'static str,
    payment_methods: [&'a str; 1],
    customer: Customer<'a>,
}

#[derive(Debug, Serialize)]
struct Customer<'a> {
    email: &'a str,
    mobile_number: &'a str,
}

#[derive(Debug, Deserialize)]
struct InvoiceResponse {
    id: String,
    #[serde(default)]
    external_id: Option<String>,
    status: String,
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default)]
    invoice_url: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    expiry_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    paid_at: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
struct InvoiceCallback {
    id: String,
    #[serde(default)]
    external_id: Option<String>,
    status: String,
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default)]
    paid_amount: Option<f64>,
    #[serde(default)]
    payment_method: Option<String>,
    #[serde(default)]
    payment_channel: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    paid_at: Option<OffsetDateTime>,
}

/// Map Xendit's invoice vocabulary. Unknown values stay pending.
pub fn map_status(status: &str) -> InvoiceStatus {
    match status.to_ascii_uppercase().as_str() {
        "PAID" | "SETTLED" => InvoiceStatus::Paid,
        "EXPIRED" => InvoiceStatus::Expired,
        "FAILED" => InvoiceStatus::Failed,
        other => InvoiceStatus::Pending(other.to_string()),
    }
}

fn to_primitive(at: OffsetDateTime) -> time::PrimitiveDateTime {
    let utc = at.to_offset(time::UtcOffset::UTC);
    time::PrimitiveDateTime::new(utc.date(), utc.time())
}

fn whole_units(amount: f64) -> i64 {
    amount.round() as i64
}

pub struct XenditGateway {
    config: XenditConfig,
    http: reqwest::Client,
}

impl XenditGateway {
    pub fn new(config: XenditConfig) -> Result<Self, reqwest::Error> {
        let http = client_with_timeout(config.timeout)?;
        Ok(Self { config, http })
    }

    fn endpoint(&self, path: &str) -> Result<url::Url, GatewayError> {
        self.config
            .api_base
            .join(path)
            .map_err(|e| GatewayError::Rejected(format!("invalid endpoint {path}: {e}")))
    }
}

#[async_trait]
impl PaymentGateway for XenditGateway {
    fn name(&self) -> &'static str {
        "xendit"
    }

    fn signature_header(&self) -> &'static str {
        CALLBACK_TOKEN_HEADER
    }

    #[tracing::instrument(skip_all, err, fields(order_id = %request.order_id))]
    async fn create_invoice(&self, request: InvoiceRequest) -> Result<Invoice, GatewayError> {
        let body = CreateInvoiceBody {
            external_id: request.order_id.to_string(),
            amount: request.amount,
            payer_email: &request.customer_email,
            description: &request.description,
            invoice_duration: request.ttl.as_secs(),
            success_redirect_url: &request.success_redirect_url,
            failure_redirect_url: &request.failure_redirect_url,
            currency: "IDR",
            payment_methods: [request.payment_method.as_str()],
            customer: Customer {
                email: &request.customer_email,
                mobile_number: &request.customer_phone,
            },
        };
        let response = self
            .http
            .post(self.endpoint("v2/invoices")?)
            .basic_auth(&self.config.secret_key, Some(""))
            .json(&body)
            .send()
            .await?;
        let invoice: InvoiceResponse = read_json(response).await?;
        Ok(Invoice {
            invoice_id: invoice.id,
            checkout_url: invoice.invoice_url,
            qr_string: None,
            expires_at: invoice.expiry_date.map(to_primitive),
            payment_instructions: Vec::new(),
        })
    }

    fn verify_webhook(&self, signature: Option<&str>, _payload: &[u8]) -> bool {
        match signature {
            Some(token) => verify_token(token, &self.config.callback_token).is_ok(),
            None => false,
        }
    }

    fn parse_event(&self, payload: &[u8]) -> Result<PaymentEvent, GatewayError> {
        let callback: InvoiceCallback = parse_json(payload)?;
        let amount = callback.paid_amount.or(callback.amount).map(whole_units);
        Ok(PaymentEvent {
            status: map_status(&callback.status),
            order_id: callback
                .external_id
                .as_deref()
                .and_then(|id| Uuid::parse_str(id).ok()),
            amount,
            payment_method: callback.payment_channel.or(callback.payment_method),
            paid_at: callback.paid_at.map(to_primitive),
            event_id: Some(format!("{}:{}", callback.id, callback.status)),
            invoice_id: callback.id,
        })
    }

    #[tracing::instrument(skip(self), err)]
    async fn get_invoice(&self, invoice_id: &str) -> Result<InvoiceDetails, GatewayError> {
        let path = format!("v2/invoices/{}", urlencoding::encode(invoice_id));
        let response = self
            .http
            .get(self.endpoint(&path)?)
            .basic_auth(&self.config.secret_key, Some(""))
            .send()
            .await?;
        let invoice: InvoiceResponse = read_json(response).await?;
        tracing::debug!(
            invoice_id = %invoice.id,
            external_id = ?invoice.external_id,
            status = %invoice.status,
            "Fetched Xendit invoice"
        );
        Ok(InvoiceDetails {
            status: map_status(&invoice.status),
            amount: invoice.amount.map(whole_units),
            paid_at: invoice.paid_at.map(to_primitive),
            invoice_id: invoice.id,
        })
    }
}
