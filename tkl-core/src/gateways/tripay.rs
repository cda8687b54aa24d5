//! Tripay closed-payment transactions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tkl_sdk::signature::{hmac_sha256_hex, verify_hex};
use uuid::Uuid;

use super::{
    GatewayError, Invoice, InvoiceDetails, InvoiceRequest, InvoiceStatus, PaymentEvent,
    PaymentGateway, parse_json, read_json,
};
use crate::config::TripayConfig;
use crate::utils::clock::{from_unix, now, to_unix};
use crate::utils::http::client_with_timeout;

pub const CALLBACK_SIGNATURE_HEADER: &str = "X-Callback-Signature";

#[derive(Debug, Serialize)]
struct CreateTransactionBody<'a> {
    method: &'a str,
    merchant_ref: String,
    amount: i64,
    customer_name: &'a str,
    customer_email: &'a str,
    customer_phone: &'a str,
    order_items: [OrderItem<'a>; 1],
    return_url: &'a str,
    expired_time: i64,
    signature: String,
}

#[derive(Debug, Serialize)]
struct OrderItem<'a> {
    sku: &'a str,
    name: &'a str,
    price: i64,
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Instruction {
    title: String,
    #[serde(default)]
    steps: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    reference: String,
    status: String,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default)]
    checkout_url: Option<String>,
    #[serde(default)]
    pay_code: Option<String>,
    #[serde(default)]
    qr_string: Option<String>,
    #[serde(default)]
    expired_time: Option<i64>,
    #[serde(default)]
    paid_at: Option<i64>,
    #[serde(default)]
    instructions: Vec<Instruction>,
}

#[derive(Debug, Deserialize)]
struct Callback {
    reference: String,
    merchant_ref: String,
    status: String,
    #[serde(default)]
    total_amount: Option<i64>,
    #[serde(default)]
    payment_method: Option<String>,
    #[serde(default)]
    paid_at: Option<i64>,
}

/// Map Tripay's transaction vocabulary. Unknown values stay pending.
pub fn map_status(status: &str) -> InvoiceStatus {
    match status.to_ascii_uppercase().as_str() {
        "PAID" => InvoiceStatus::Paid,
        "EXPIRED" => InvoiceStatus::Expired,
        "FAILED" | "REFUND" => InvoiceStatus::Failed,
        other => InvoiceStatus::Pending(other.to_string()),
    }
}

pub struct TripayGateway {
    config: TripayConfig,
    http: reqwest::Client,
}

impl TripayGateway {
    pub fn new(config: TripayConfig) -> Result<Self, reqwest::Error> {
        let http = client_with_timeout(config.timeout)?;
        Ok(Self { config, http })
    }

    /// `hex(HMAC-SHA256(merchantCode + merchantRef + amount, privateKey))`.
    pub fn request_signature(&self, merchant_ref: &str, amount: i64) -> Result<String, GatewayError> {
        let data = format!("{}{}{}", self.config.merchant_code, merchant_ref, amount);
        hmac_sha256_hex(data.as_bytes(), self.config.private_key.as_bytes())
            .map_err(|e| GatewayError::Rejected(format!("cannot sign request: {e}")))
    }

    fn endpoint(&self, path: &str) -> Result<url::Url, GatewayError> {
        self.config
            .api_base
            .join(path)
            .map_err(|e| GatewayError::Rejected(format!("invalid endpoint {path}: {e}")))
    }

    fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<T, GatewayError> {
        match (envelope.success, envelope.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(GatewayError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "tripay returned no data".into()),
            )),
        }
    }
}

#[async_trait]
impl PaymentGateway for TripayGateway {
    fn name(&self) -> &'static str {
        "tripay"
    }

    fn signature_header(&self) -> &'static str {
        CALLBACK_SIGNATURE_HEADER
    }

    #[tracing::instrument(skip_all, err, fields(order_id = %request.order_id))]
    async fn create_invoice(&self, request: InvoiceRequest) -> Result<Invoice, GatewayError> {
        let merchant_ref = request.order_id.to_string();
        let signature = self.request_signature(&merchant_ref, request.amount)?;
        let ttl = time::Duration::try_from(request.ttl).unwrap_or(time::Duration::HOUR);
        let body = CreateTransactionBody {
            method: &request.payment_method,
            amount: request.amount,
            customer_name: &request.customer_email,
            customer_email: &request.customer_email,
            customer_phone: &request.customer_phone,
            order_items: [OrderItem {
                sku: &request.order_code,
                name: &request.description,
                price: request.amount,
                quantity: 1,
            }],
            return_url: &request.success_redirect_url,
            expired_time: to_unix(now() + ttl),
            merchant_ref,
            signature,
        };
        let response = self
            .http
            .post(self.endpoint("transaction/create")?)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;
        let envelope: Envelope<TransactionData> = read_json(response).await?;
        let data = Self::unwrap_envelope(envelope)?;

        let mut payment_instructions = Vec::new();
        if let Some(code) = &data.pay_code {
            payment_instructions.push(format!("Payment code: {code}"));
        }
        for instruction in data.instructions {
            payment_instructions.push(instruction.title);
            payment_instructions.extend(instruction.steps);
        }
        Ok(Invoice {
            invoice_id: data.reference,
            checkout_url: data.checkout_url,
            qr_string: data.qr_string,
            expires_at: data.expired_time.and_then(from_unix),
            payment_instructions,
        })
    }

    fn verify_webhook(&self, signature: Option<&str>, payload: &[u8]) -> bool {
        match signature {
            Some(sig) => verify_hex(payload, sig, self.config.private_key.as_bytes()).is_ok(),
            None => false,
        }
    }

    fn parse_event(&self, payload: &[u8]) -> Result<PaymentEvent, GatewayError> {
        let callback: Callback = parse_json(payload)?;
        Ok(PaymentEvent {
            status: map_status(&callback.status),
            order_id: Uuid::parse_str(&callback.merchant_ref).ok(),
            amount: callback.total_amount,
            payment_method: callback.payment_method,
            paid_at: callback.paid_at.and_then(from_unix),
            event_id: Some(format!("{}:{}", callback.reference, callback.status)),
            invoice_id: callback.reference,
        })
    }

    #[tracing::instrument(skip(self), err)]
    async fn get_invoice(&self, invoice_id: &str) -> Result<InvoiceDetails, GatewayError> {
        let response = self
            .http
            .get(self.endpoint("transaction/detail")?)
            .query(&[("reference", invoice_id)])
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;
        let envelope: Envelope<TransactionData> = read_json(response).await?;
        let data = Self::unwrap_envelope(envelope)?;
        Ok(InvoiceDetails {
            status: map_status(&data.status),
            amount: data.amount,
            paid_at: data.paid_at.and_then(from_unix),
            invoice_id: data.reference,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn gateway() -> TripayGateway {
        TripayGateway::new(TripayConfig {
            api_base: url::Url::parse("https://tripay.co.id/api-sandbox/").unwrap(),
            api_key: "DEV-key".into(),
            private_key: "private".into(),
            merchant_code: "T0001".into(),
            timeout: Duration::from_secs(10),
        })
        .unwrap()
    }

    #[test]
    fn status_vocabulary() {
        assert_eq!(map_status("PAID"), InvoiceStatus::Paid);
        assert_eq!(map_status("REFUND"), InvoiceStatus::Failed);
        assert_eq!(map_status("EXPIRED"), InvoiceStatus::Expired);
        assert!(!map_status("UNPAID").is_final());
    }

    #[test]
    fn request_signature_covers_code_ref_and_amount() {
        let gw = gateway();
        let expected = hmac_sha256_hex(b"T0001INV-151000", b"private").unwrap();
        assert_eq!(gw.request_signature("INV-1", 51_000).unwrap(), expected);
        assert_ne!(gw.request_signature("INV-1", 51_001).unwrap(), expected);
    }

    #[test]
    fn callback_signature_is_over_raw_body() {
        let gw = gateway();
        let order_id = Uuid::new_v4();
        let body = format!(
            r#"{{"reference":"T0001123","merchant_ref":"{order_id}","status":"PAID","total_amount":51000,"paid_at":1714557600}}"#
        );
        let sig = hmac_sha256_hex(body.as_bytes(), b"private").unwrap();
        assert!(gw.verify_webhook(Some(&sig), body.as_bytes()));
        assert!(!gw.verify_webhook(Some(&sig), b"tampered"));
        assert!(!gw.verify_webhook(None, body.as_bytes()));

        let event = gw.parse_event(body.as_bytes()).unwrap();
        assert_eq!(event.order_id, Some(order_id));
        assert_eq!(event.status, InvoiceStatus::Paid);
        assert_eq!(event.invoice_id, "T0001123");
    }
}
