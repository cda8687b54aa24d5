//! Checkout, quote, lookup, resume and target verification.

use serde_json::json;
use tkl_sdk::objects::{
    CheckoutResponse, CreateOrderRequest, PriceBreakdown, QuoteRequest, Target,
    VerifyTargetResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::validation::{validate_contact, validate_target};
use super::{Orchestrator, OrderError};
use crate::entities::OrderStatus;
use crate::entities::catalog::{Denomination, Product};
use crate::entities::order::{Order, OrderInsert, OrderPatch};
use crate::entities::promo::Promo;
use crate::entities::transaction_log::LogKind;
use crate::gateways::InvoiceRequest;
use crate::pricing::{self, PromoRejection};
use crate::store::{CreateOutcome, StoreError};
use crate::utils::clock::{now, to_unix};
use crate::utils::idempotency::{IdempotencyInput, derive_key, sanitize_client_key};
use crate::utils::order_code;

/// Fresh order codes tried before giving up on a create.
const CODE_ATTEMPTS: u32 = 3;

/// Result of [`Orchestrator::create_order`].
#[derive(Debug, Clone)]
pub struct CheckoutResult {
    pub order: Order,
    /// The idempotency key matched an earlier checkout; nothing new was created.
    pub replayed: bool,
}

impl CheckoutResult {
    pub fn to_response(&self) -> CheckoutResponse {
        checkout_response(&self.order)
    }
}

/// Customer view of an order plus whatever is needed to pay it.
pub fn checkout_response(order: &Order) -> CheckoutResponse {
    CheckoutResponse {
        order: order.to_view(),
        payment_url: order.checkout_url.clone(),
        qr_code: order.payment_qr.clone(),
        payment_instructions: order.payment_instructions.0.clone(),
        expires_at: order.payment_expires_at.map(to_unix),
    }
}

impl Orchestrator {
    async fn load_promo(
        &self,
        code: Option<&str>,
        subtotal: i64,
    ) -> Result<Option<Promo>, OrderError> {
        let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
            return Ok(None);
        };
        let promo = self
            .store
            .promo_by_code(code)
            .await?
            .ok_or(OrderError::NotFound("Promo code"))?;
        pricing::check_promo(&promo, subtotal, now())?;
        Ok(Some(promo))
    }

    /// Price a denomination with an optional promo. Nothing is reserved.
    pub async fn quote(&self, request: &QuoteRequest) -> Result<PriceBreakdown, OrderError> {
        let (_, denomination) = self
            .load_offer(request.product_id, request.denomination_id)
            .await?;
        let subtotal = pricing::subtotal(&denomination);
        let promo = self
            .load_promo(request.promo_code.as_deref(), subtotal)
            .await?;
        Ok(pricing::calculate(&denomination, promo.as_ref()))
    }

    /// Create an order and open its invoice.
    ///
    /// Repeating a checkout with the same idempotency key returns the order
    /// created the first time. If the invoice could not be opened, the order
    /// stays PENDING and the error carries its code.
    #[tracing::instrument(skip_all, fields(product_id = %request.product_id))]
    pub async fn create_order(
        &self,
        request: &CreateOrderRequest,
        client_key: Option<&str>,
    ) -> Result<CheckoutResult, OrderError> {
        validate_contact(
            &request.contact_email,
            &request.contact_whatsapp,
            &request.payment_method,
        )?;
        let (product, denomination) = self
            .load_offer(request.product_id, request.denomination_id)
            .await?;
        validate_target(product.category.into(), &request.target)?;

        let idempotency_key = match client_key {
            Some(raw) => sanitize_client_key(raw).ok_or_else(|| {
                OrderError::validation("idempotencyKey", "Invalid Idempotency-Key header")
            })?,
            None => derive_key(
                IdempotencyInput {
                    product_id: request.product_id,
                    denomination_id: request.denomination_id,
                    target: &request.target,
                    contact_email: &request.contact_email,
                    contact_whatsapp: &request.contact_whatsapp,
                },
                to_unix(now()),
                self.checkout.idempotency_bucket.as_secs(),
            ),
        };

        if let Some(existing) = self
            .store
            .order_by_idempotency_key(&idempotency_key)
            .await?
        {
            return self.replay(existing, request, &product, &denomination).await;
        }

        let subtotal = pricing::subtotal(&denomination);
        let promo = self
            .load_promo(request.promo_code.as_deref(), subtotal)
            .await?;
        let price = pricing::calculate(&denomination, promo.as_ref());

        let mut attempt = 0;
        let outcome = loop {
            attempt += 1;
            let insert = OrderInsert {
                id: Uuid::now_v7(),
                code: order_code::generate(&self.checkout.code_prefix),
                product_id: product.id,
                denomination_id: denomination.id,
                target: request.target.clone(),
                contact_email: request.contact_email.trim().to_string(),
                contact_whatsapp: request.contact_whatsapp.trim().to_string(),
                payment_method: request.payment_method.trim().to_ascii_uppercase(),
                gateway: self.gateway.name().to_string(),
                price,
                promo_id: promo.as_ref().map(|p| p.id),
                idempotency_key: idempotency_key.clone(),
            };
            let log = json!({
                "code": insert.code,
                "price": price,
                "promoCode": promo.as_ref().map(|p| p.code.clone()),
                "target": request.target.canonical(),
            });
            match self.store.create_order(insert, log).await {
                Ok(outcome) => break outcome,
                Err(StoreError::CodeConflict) if attempt < CODE_ATTEMPTS => {
                    warn!(attempt, "Order code collision, drawing a new one");
                }
                Err(StoreError::PromoExhausted) => {
                    return Err(PromoRejection::UsageLimitReached.into());
                }
                Err(e) => return Err(e.into()),
            }
        };

        let order = match outcome {
            CreateOutcome::Created(order) => order,
            CreateOutcome::Existing(order) => {
                return self.replay(order, request, &product, &denomination).await;
            }
        };
        info!(order_id = %order.id, code = %order.code, total = order.total_amount, "Order created");

        let order = self
            .start_payment(order, &product, &denomination)
            .await?;
        Ok(CheckoutResult {
            order,
            replayed: false,
        })
    }

    async fn replay(
        &self,
        existing: Order,
        request: &CreateOrderRequest,
        product: &Product,
        denomination: &Denomination,
    ) -> Result<CheckoutResult, OrderError> {
        if existing.product_id != request.product_id
            || existing.denomination_id != request.denomination_id
            || existing.target.0 != request.target
            || !existing.contact_matches(&request.contact_email)
            || existing.contact_whatsapp != request.contact_whatsapp.trim()
        {
            return Err(OrderError::validation(
                "idempotencyKey",
                "Idempotency-Key was already used for a different order",
            ));
        }
        info!(order_id = %existing.id, code = %existing.code, "Checkout replayed");
        let order = if needs_invoice(&existing) {
            self.start_payment(existing, product, denomination).await?
        } else {
            existing
        };
        Ok(CheckoutResult {
            order,
            replayed: true,
        })
    }

    /// Open the invoice for a PENDING order and move it to WAITING_PAYMENT.
    ///
    /// A zero total skips the gateway and marks the order PAID directly.
    async fn start_payment(
        &self,
        order: Order,
        product: &Product,
        denomination: &Denomination,
    ) -> Result<Order, OrderError> {
        if order.total_amount == 0 {
            return self.settle_free_order(order).await;
        }

        let request = InvoiceRequest {
            order_id: order.id,
            order_code: order.code.clone(),
            amount: order.total_amount,
            customer_email: order.contact_email.clone(),
            customer_phone: order.contact_whatsapp.clone(),
            description: format!("{} {}", product.name, denomination.label),
            payment_method: order.payment_method.clone(),
            success_redirect_url: self
                .checkout
                .redirect_for(&self.checkout.success_redirect_url, &order.code),
            failure_redirect_url: self
                .checkout
                .redirect_for(&self.checkout.failure_redirect_url, &order.code),
            ttl: self.checkout.invoice_ttl,
        };

        let invoice = match self.gateway.create_invoice(request).await {
            Ok(invoice) => invoice,
            Err(e) => {
                warn!(order_id = %order.id, error = %e, retryable = e.is_retryable(), "Invoice creation failed");
                self.audit(
                    order.id,
                    LogKind::InvoiceFailed,
                    json!({ "gateway": self.gateway.name(), "error": e.to_string() }),
                )
                .await;
                return Err(OrderError::InvoiceFailed {
                    order_code: order.code,
                    source: e,
                });
            }
        };

        self.audit(
            order.id,
            LogKind::InvoiceIssued,
            json!({
                "gateway": self.gateway.name(),
                "invoiceId": invoice.invoice_id,
                "expiresAt": invoice.expires_at.map(to_unix),
            }),
        )
        .await;

        let patch = OrderPatch {
            payment_ref: Some(invoice.invoice_id),
            checkout_url: invoice.checkout_url,
            payment_qr: invoice.qr_string,
            payment_instructions: Some(invoice.payment_instructions),
            payment_expires_at: invoice.expires_at,
            ..Default::default()
        };
        match self
            .store
            .transition(order.id, &[OrderStatus::Pending], OrderStatus::WaitingPayment, patch)
            .await?
        {
            Some(updated) => Ok(updated),
            // A webhook can settle the order before the invoice is recorded.
            None => Ok(self.store.order(order.id).await?.unwrap_or(order)),
        }
    }

    async fn settle_free_order(&self, order: Order) -> Result<Order, OrderError> {
        let patch = OrderPatch {
            paid_at: Some(now()),
            ..Default::default()
        };
        let Some(paid) = self
            .store
            .transition(order.id, OrderStatus::Paid.sources(), OrderStatus::Paid, patch)
            .await?
        else {
            return Ok(self.store.order(order.id).await?.unwrap_or(order));
        };
        info!(order_id = %paid.id, "Order fully discounted, skipping payment");
        self.audit(paid.id, LogKind::PaymentReceived, json!({ "amount": 0, "free": true }))
            .await;
        self.enqueue(&paid);
        Ok(paid)
    }

    /// Find an order by code, visible only to its contact email.
    pub async fn lookup_order(&self, code: &str, email: &str) -> Result<Order, OrderError> {
        let code = order_code::normalize(code);
        if code.is_empty() {
            return Err(OrderError::validation("code", "Order code is required"));
        }
        self.store
            .order_by_code(&code)
            .await?
            .filter(|order| order.contact_matches(email))
            .ok_or(OrderError::NotFound("Order"))
    }

    /// Pick up a checkout whose invoice was never opened.
    pub async fn resume_checkout(&self, code: &str, email: &str) -> Result<Order, OrderError> {
        let order = self.lookup_order(code, email).await?;
        if !needs_invoice(&order) {
            return Ok(order);
        }
        let product = self
            .store
            .product(order.product_id)
            .await?
            .ok_or(OrderError::NotFound("Product"))?;
        let denomination = self
            .store
            .denomination(order.denomination_id)
            .await?
            .ok_or(OrderError::NotFound("Denomination"))?;
        info!(order_id = %order.id, "Resuming checkout");
        self.start_payment(order, &product, &denomination).await
    }

    /// Ask the provider whether `target` can receive `product_id`.
    ///
    /// Provider trouble is reported as an invalid result, never as an error.
    pub async fn verify_target(
        &self,
        product_id: Uuid,
        target: &Target,
    ) -> Result<VerifyTargetResponse, OrderError> {
        let product = self
            .store
            .product(product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(OrderError::NotFound("Product"))?;
        validate_target(product.category.into(), target)?;

        let product_code = product.provider_code.as_deref().unwrap_or(&product.slug);
        let check = tokio::time::timeout(
            self.checkout.target_verify_timeout,
            self.provider.verify_target(product_code, target),
        )
        .await;
        let response = match check {
            Ok(Ok(check)) => VerifyTargetResponse {
                valid: check.valid,
                display_name: check.display_name,
                error: check.error,
            },
            Ok(Err(e)) => {
                warn!(product_id = %product_id, error = %e, "Target verification failed");
                VerifyTargetResponse {
                    valid: false,
                    display_name: None,
                    error: Some("verification unavailable".into()),
                }
            }
            Err(_) => VerifyTargetResponse {
                valid: false,
                display_name: None,
                error: Some("verification timed out".into()),
            },
        };
        Ok(response)
    }
}

fn needs_invoice(order: &Order) -> bool {
    order.status == OrderStatus::Pending && order.payment_ref.is_none()
}
