//! In-process gateway for development and tests.
//!
//! Invoices live in memory. Webhooks use the SDK's timestamped
//! `X-Signature` scheme so the real verification path is exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use time::Duration as TimeDuration;
use tkl_sdk::objects::MockPaymentWebhook;
use tkl_sdk::objects::webhook::{INVOICE_EXPIRED, INVOICE_FAILED, INVOICE_PAID};
use tkl_sdk::signature::{SIGNATURE_HEADER, SignatureError, SignedObject};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    GatewayError, Invoice, InvoiceDetails, InvoiceRequest, InvoiceStatus, PaymentEvent,
    PaymentGateway, parse_json,
};
use crate::config::MockGatewayConfig;
use crate::utils::clock::{from_unix, now, to_unix};

#[derive(Debug, Clone)]
struct MockInvoice {
    invoice: Invoice,
    order_id: Uuid,
    amount: i64,
    payment_method: String,
    status: InvoiceStatus,
    paid_at: Option<time::PrimitiveDateTime>,
}

pub struct MockGateway {
    config: MockGatewayConfig,
    invoices: RwLock<HashMap<String, MockInvoice>>,
    by_order: RwLock<HashMap<Uuid, String>>,
    fail_next: AtomicU32,
}

impl MockGateway {
    pub fn new(config: MockGatewayConfig) -> Self {
        Self {
            config,
            invoices: RwLock::new(HashMap::new()),
            by_order: RwLock::new(HashMap::new()),
            fail_next: AtomicU32::new(0),
        }
    }

    /// Make the next `n` invoice requests fail as if the gateway were down.
    pub fn fail_next_invoices(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Invoice id issued for `order_id`, if any.
    pub async fn invoice_for_order(&self, order_id: Uuid) -> Option<String> {
        self.by_order.read().await.get(&order_id).cloned()
    }

    /// Move an invoice to a new state, as a customer paying would.
    pub async fn settle(&self, invoice_id: &str, status: InvoiceStatus) -> bool {
        let mut invoices = self.invoices.write().await;
        let Some(entry) = invoices.get_mut(invoice_id) else {
            return false;
        };
        if status == InvoiceStatus::Paid {
            entry.paid_at = Some(now());
        }
        entry.status = status;
        true
    }

    /// Build the signed webhook the gateway would send for `invoice_id`.
    ///
    /// Returns `(X-Signature header value, JSON body)`.
    pub async fn signed_webhook(
        &self,
        invoice_id: &str,
        event: &str,
    ) -> Result<Option<(String, String)>, SignatureError> {
        let invoices = self.invoices.read().await;
        let Some(entry) = invoices.get(invoice_id) else {
            return Ok(None);
        };
        let payload = MockPaymentWebhook {
            event: event.to_string(),
            invoice_id: invoice_id.to_string(),
            order_id: Some(entry.order_id),
            amount: entry.amount,
            payment_method: Some(entry.payment_method.clone()),
            paid_at: entry.paid_at.map(to_unix),
        };
        let signed = SignedObject::new(payload, &self.config.webhook_secret)?;
        Ok(Some((signed.to_header(), signed.json)))
    }

    fn build_invoice(&self, request: &InvoiceRequest) -> Invoice {
        let invoice_id = format!("inv_{}", Uuid::new_v4().simple());
        let checkout_url = self
            .config
            .public_base_url
            .join(&format!("pay/{invoice_id}"))
            .map(|u| u.to_string())
            .ok();
        let method = request.payment_method.to_ascii_uppercase();
        let qr_string = (method == "QRIS")
            .then(|| format!("MOCKQRIS|{invoice_id}|{}", request.amount));
        let payment_instructions = if method.ends_with("_VA") {
            let bank = method.trim_end_matches("_VA");
            let number: String = request
                .order_id
                .as_u128()
                .to_string()
                .chars()
                .take(10)
                .collect();
            vec![
                format!("Open your {bank} mobile banking app"),
                format!("Transfer {} to virtual account 8808{number}", request.amount),
            ]
        } else {
            Vec::new()
        };
        let ttl = TimeDuration::try_from(request.ttl).unwrap_or(TimeDuration::HOUR);
        Invoice {
            invoice_id,
            checkout_url,
            qr_string,
            expires_at: Some(now() + ttl),
            payment_instructions,
        }
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn signature_header(&self) -> &'static str {
        SIGNATURE_HEADER
    }

    async fn create_invoice(&self, request: InvoiceRequest) -> Result<Invoice, GatewayError> {
        if request.amount < 0 {
            return Err(GatewayError::Rejected("amount must not be negative".into()));
        }
        let pending_failures = self.fail_next.load(Ordering::SeqCst);
        if pending_failures > 0 {
            self.fail_next.store(pending_failures - 1, Ordering::SeqCst);
            return Err(GatewayError::Transient("mock gateway unavailable".into()));
        }

        let mut by_order = self.by_order.write().await;
        let mut invoices = self.invoices.write().await;
        if let Some(existing) = by_order
            .get(&request.order_id)
            .and_then(|id| invoices.get(id))
        {
            return Ok(existing.invoice.clone());
        }

        let invoice = self.build_invoice(&request);
        by_order.insert(request.order_id, invoice.invoice_id.clone());
        invoices.insert(
            invoice.invoice_id.clone(),
            MockInvoice {
                invoice: invoice.clone(),
                order_id: request.order_id,
                amount: request.amount,
                payment_method: request.payment_method,
                status: InvoiceStatus::Pending("PENDING".into()),
                paid_at: None,
            },
        );
        Ok(invoice)
    }

    fn verify_webhook(&self, signature: Option<&str>, payload: &[u8]) -> bool {
        let Some(header) = signature else {
            return false;
        };
        let Ok(body) = std::str::from_utf8(payload) else {
            return false;
        };
        SignedObject::<MockPaymentWebhook>::from_header_and_body(header, body.to_string())
            .and_then(|signed| signed.verify(&self.config.webhook_secret))
            .is_ok()
    }

    fn parse_event(&self, payload: &[u8]) -> Result<PaymentEvent, GatewayError> {
        let webhook: MockPaymentWebhook = parse_json(payload)?;
        let status = match webhook.event.as_str() {
            INVOICE_PAID => InvoiceStatus::Paid,
            INVOICE_EXPIRED => InvoiceStatus::Expired,
            INVOICE_FAILED => InvoiceStatus::Failed,
            other => InvoiceStatus::Pending(other.to_string()),
        };
        Ok(PaymentEvent {
            status,
            event_id: Some(format!("{}:{}", webhook.invoice_id, webhook.event)),
            invoice_id: webhook.invoice_id,
            order_id: webhook.order_id,
            amount: Some(webhook.amount),
            payment_method: webhook.payment_method,
            paid_at: webhook.paid_at.and_then(from_unix),
        })
    }

    async fn get_invoice(&self, invoice_id: &str) -> Result<InvoiceDetails, GatewayError> {
        let invoices = self.invoices.read().await;
        let entry = invoices
            .get(invoice_id)
            .ok_or_else(|| GatewayError::InvoiceNotFound(invoice_id.to_string()))?;
        Ok(InvoiceDetails {
            invoice_id: invoice_id.to_string(),
            status: entry.status.clone(),
            amount: Some(entry.amount),
            paid_at: entry.paid_at,
        })
    }
}
