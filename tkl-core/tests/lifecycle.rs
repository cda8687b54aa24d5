//! End-to-end order lifecycle scenarios against the in-memory store.
//!
//! Tests cover:
//! - Checkout pricing, invoice issuance and idempotent replays
//! - Promo validation and the usage limit under concurrent checkouts
//! - Payment webhooks: signatures, duplicates, amount mismatches
//! - Fulfillment: success, provider failure, retries, voucher stock
//! - Provider callbacks and resume-checkout

mod common;

use std::time::Duration;

use common::{Harness, WEBHOOK_SECRET, checkout_config};
use tkl_core::entities::transaction_log::LogKind;
use tkl_core::entities::webhook_event::WebhookEventOutcome;
use tkl_core::entities::{DiscountType, OrderStatus};
use tkl_core::orchestrator::{AttemptOutcome, OrderError, WebhookError};
use tkl_core::pricing::PromoRejection;
use tkl_core::providers::{CallbackPolicy, MockOutcome, MockProvider};
use tkl_core::store::OrderStore;
use tkl_core::utils::clock::now;
use tkl_sdk::objects::webhook::INVOICE_PAID;
use tkl_sdk::objects::{MockPaymentWebhook, QuoteRequest, Target, WebhookOutcome};
use tkl_sdk::signature::SignedObject;

#[tokio::test]
async fn happy_path_reaches_success() {
    let mut h = Harness::new().await;

    let checkout = h
        .orchestrator
        .create_order(&h.request("buyer@example.com"), None)
        .await
        .unwrap();
    assert!(!checkout.replayed);
    let order = checkout.order;
    assert_eq!(order.total_amount, 51_000);
    assert_eq!(order.base_price, 50_000);
    assert_eq!(order.fee_flat, 1_000);
    assert_eq!(order.status, OrderStatus::WaitingPayment);
    assert!(order.code.starts_with("TKL"));
    assert!(order.payment_ref.is_some());
    assert!(order.payment_qr.is_some());

    let response = checkout_response_of(&order);
    assert!(response.payment_url.is_some());
    assert!(response.expires_at.is_some());

    assert_eq!(h.pay(&order).await, WebhookOutcome::Processed);
    let paid = h.order(order.id).await;
    assert_eq!(paid.status, OrderStatus::Paid);
    assert!(paid.paid_at.is_some());

    let job = h.next_job();
    assert_eq!(job.order_id, order.id);
    assert_eq!(job.idempotency_key, order.idempotency_key);
    assert_eq!(job.attempt, 1);

    let outcome = h.orchestrator.run_fulfillment(&job).await.unwrap();
    assert_eq!(outcome, AttemptOutcome::Settled(OrderStatus::Success));

    let done = h.order(order.id).await;
    assert_eq!(done.status, OrderStatus::Success);
    assert!(done.success_at.is_some());
    assert_eq!(done.fulfillment_attempts, 1);
    assert_eq!(
        done.provider_order_id,
        Some(MockProvider::provider_order_id(order.id))
    );

    let kinds: Vec<LogKind> = h
        .store
        .logs_for_order(order.id)
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            LogKind::OrderCreated,
            LogKind::InvoiceIssued,
            LogKind::PaymentReceived,
            LogKind::FulfillmentStarted,
            LogKind::TopupResult,
        ]
    );

    // A stale job for a settled order is a no-op.
    let again = h.orchestrator.run_fulfillment(&job).await.unwrap();
    assert!(matches!(again, AttemptOutcome::Skipped(_)));
    assert_eq!(h.provider.fulfill_calls(order.id).await, 1);
}

fn checkout_response_of(
    order: &tkl_core::entities::order::Order,
) -> tkl_sdk::objects::CheckoutResponse {
    tkl_core::orchestrator::checkout_response(order)
}

#[tokio::test]
async fn repeated_checkout_returns_the_first_order() {
    let h = Harness::new().await;
    let request = h.request("buyer@example.com");

    let first = h.orchestrator.create_order(&request, None).await.unwrap();
    let second = h.orchestrator.create_order(&request, None).await.unwrap();

    assert!(second.replayed);
    assert_eq!(first.order.id, second.order.id);
    assert_eq!(first.order.code, second.order.code);
    assert_eq!(first.order.payment_ref, second.order.payment_ref);
    assert_eq!(h.store.order_count().await, 1);
}

#[tokio::test]
async fn client_idempotency_key_is_honoured() {
    let h = Harness::new().await;

    let first = h
        .orchestrator
        .create_order(&h.request("a@example.com"), Some("checkout-0001"))
        .await
        .unwrap();
    // Same key and the same buyer, modulo case and spacing.
    let second = h
        .orchestrator
        .create_order(&h.request(" A@Example.com "), Some("checkout-0001"))
        .await
        .unwrap();
    assert_eq!(first.order.id, second.order.id);
    assert!(second.replayed);

    // Another buyer reusing the key never sees the first buyer's order.
    let err = h
        .orchestrator
        .create_order(&h.request("b@example.com"), Some("checkout-0001"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::Validation {
            field: "idempotencyKey",
            ..
        }
    ));
    let mut other_phone = h.request("a@example.com");
    other_phone.contact_whatsapp = "089999999999".into();
    assert!(matches!(
        h.orchestrator
            .create_order(&other_phone, Some("checkout-0001"))
            .await,
        Err(OrderError::Validation {
            field: "idempotencyKey",
            ..
        })
    ));

    let mut other_target = h.request("a@example.com");
    other_target.target = Target::GameAccount {
        uid: "99999999".into(),
        zone_id: None,
    };
    let err = h
        .orchestrator
        .create_order(&other_target, Some("checkout-0001"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::Validation {
            field: "idempotencyKey",
            ..
        }
    ));

    let err = h
        .orchestrator
        .create_order(&h.request("a@example.com"), Some("bad key"))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Validation { .. }));
    assert_eq!(h.store.order_count().await, 1);
}

#[tokio::test]
async fn expired_promo_is_rejected_without_a_row() {
    let h = Harness::new().await;
    let mut promo = h.add_promo("LATE10", DiscountType::Percent, 10).await;
    promo.start_at = now() - time::Duration::days(10);
    promo.end_at = now() - time::Duration::days(1);
    h.store.insert_promo(promo).await;

    let mut request = h.request("buyer@example.com");
    request.promo_code = Some("late10".into());
    let err = h.orchestrator.create_order(&request, None).await.unwrap_err();

    assert!(matches!(err, OrderError::Promo(PromoRejection::Expired)));
    assert_eq!(err.to_string(), "Promo code has expired");
    assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn unknown_promo_is_not_found() {
    let h = Harness::new().await;
    let mut request = h.request("buyer@example.com");
    request.promo_code = Some("NOPE".into());
    let err = h.orchestrator.create_order(&request, None).await.unwrap_err();
    assert!(matches!(err, OrderError::NotFound("Promo code")));
}

#[tokio::test]
async fn quote_applies_promo_without_redeeming() {
    let h = Harness::new().await;
    let mut promo = h.add_promo("HEMAT", DiscountType::Percent, 10).await;
    promo.max_discount = Some(3_000);
    promo.usage_limit = Some(1);
    h.store.insert_promo(promo.clone()).await;

    let quote = h
        .orchestrator
        .quote(&QuoteRequest {
            product_id: h.product_id,
            denomination_id: h.denomination_id,
            promo_code: Some("HEMAT".into()),
        })
        .await
        .unwrap();
    assert_eq!(quote.promo_discount, 3_000);
    assert_eq!(quote.total, 48_000);
    assert_eq!(h.store.promo(promo.id).await.unwrap().used_count, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn promo_usage_limit_holds_under_concurrency() {
    let h = Harness::new().await;
    let mut promo = h.add_promo("ONCE", DiscountType::Flat, 5_000).await;
    promo.usage_limit = Some(1);
    h.store.insert_promo(promo.clone()).await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let orchestrator = h.orchestrator.clone();
        let mut request = h.request(&format!("buyer{i}@example.com"));
        request.promo_code = Some("ONCE".into());
        handles.push(tokio::spawn(async move {
            orchestrator.create_order(&request, None).await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(result) => {
                created += 1;
                assert_eq!(result.order.promo_discount, 5_000);
            }
            Err(err) => {
                assert!(matches!(
                    err,
                    OrderError::Promo(PromoRejection::UsageLimitReached)
                ));
                assert_eq!(err.to_string(), "Promo code usage limit reached");
            }
        }
    }
    assert_eq!(created, 1);
    assert_eq!(h.store.order_count().await, 1);
    assert_eq!(h.store.promo(promo.id).await.unwrap().used_count, 1);
}

#[tokio::test]
async fn fully_discounted_order_skips_payment() {
    let mut h = Harness::new().await;
    h.add_promo("GRATIS", DiscountType::Flat, 100_000).await;
    let mut request = h.request("buyer@example.com");
    request.promo_code = Some("GRATIS".into());

    let order = h.orchestrator.create_order(&request, None).await.unwrap().order;
    assert_eq!(order.total_amount, 0);
    assert_eq!(order.status, OrderStatus::Paid);
    assert!(order.payment_ref.is_none());
    assert_eq!(h.next_job().order_id, order.id);
}

#[tokio::test]
async fn duplicate_paid_webhook_enqueues_once() {
    let mut h = Harness::new().await;
    let order = h
        .orchestrator
        .create_order(&h.request("buyer@example.com"), None)
        .await
        .unwrap()
        .order;

    let (signature, body) = h.paid_webhook(&order).await;
    let first = h
        .orchestrator
        .handle_payment_webhook(Some(&signature), body.as_bytes())
        .await
        .unwrap();
    let second = h
        .orchestrator
        .handle_payment_webhook(Some(&signature), body.as_bytes())
        .await
        .unwrap();

    assert_eq!(first, WebhookOutcome::Processed);
    assert_eq!(second, WebhookOutcome::Duplicate);
    h.next_job();
    assert!(h.no_job());

    let events = h.store.webhook_events().await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].outcome, WebhookEventOutcome::Processed);
    assert_eq!(events[1].outcome, WebhookEventOutcome::Duplicate);
    assert_eq!(events[0].source, "payment:mock");
}

#[tokio::test]
async fn invalid_signature_is_rejected_and_recorded() {
    let mut h = Harness::new().await;
    let order = h
        .orchestrator
        .create_order(&h.request("buyer@example.com"), None)
        .await
        .unwrap()
        .order;
    let (_, body) = h.paid_webhook(&order).await;

    let err = h
        .orchestrator
        .handle_payment_webhook(Some("1700000000.AAAA"), body.as_bytes())
        .await
        .unwrap_err();
    assert!(matches!(err, WebhookError::InvalidSignature));

    let err = h
        .orchestrator
        .handle_payment_webhook(None, body.as_bytes())
        .await
        .unwrap_err();
    assert!(matches!(err, WebhookError::InvalidSignature));

    let events = h.store.webhook_events().await;
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.outcome == WebhookEventOutcome::Rejected));
    assert_eq!(events[0].error.as_deref(), Some("invalid signature"));
    assert_eq!(h.order(order.id).await.status, OrderStatus::WaitingPayment);
    assert!(h.no_job());
}

#[tokio::test]
async fn webhook_for_unknown_invoice_is_not_found() {
    let h = Harness::new().await;
    let payload = MockPaymentWebhook {
        event: INVOICE_PAID.into(),
        invoice_id: "inv_missing".into(),
        order_id: None,
        amount: 10_000,
        payment_method: None,
        paid_at: None,
    };
    let signed = SignedObject::new(payload, WEBHOOK_SECRET).unwrap();
    let err = h
        .orchestrator
        .handle_payment_webhook(Some(&signed.to_header()), signed.json.as_bytes())
        .await
        .unwrap_err();
    assert!(matches!(err, WebhookError::OrderNotFound));
}

#[tokio::test]
async fn paid_amount_mismatch_does_not_transition() {
    let mut h = Harness::new().await;
    let order = h
        .orchestrator
        .create_order(&h.request("buyer@example.com"), None)
        .await
        .unwrap()
        .order;

    let payload = MockPaymentWebhook {
        event: INVOICE_PAID.into(),
        invoice_id: order.payment_ref.clone().unwrap(),
        order_id: Some(order.id),
        amount: 1_000,
        payment_method: Some("QRIS".into()),
        paid_at: None,
    };
    let signed = SignedObject::new(payload, WEBHOOK_SECRET).unwrap();
    let outcome = h
        .orchestrator
        .handle_payment_webhook(Some(&signed.to_header()), signed.json.as_bytes())
        .await
        .unwrap();

    assert_eq!(outcome, WebhookOutcome::Ignored);
    assert_eq!(h.order(order.id).await.status, OrderStatus::WaitingPayment);
    assert!(h.no_job());
    let events = h.store.webhook_events().await;
    assert!(events[0].error.as_deref().unwrap().contains("amount mismatch"));
}

#[tokio::test]
async fn provider_failure_is_terminal() {
    let mut h = Harness::new().await;
    h.provider
        .push_fulfill(MockOutcome::Failed("Invalid user id".into()))
        .await;
    let order = h
        .orchestrator
        .create_order(&h.request("buyer@example.com"), None)
        .await
        .unwrap()
        .order;
    h.pay(&order).await;
    let job = h.next_job();

    let outcome = h.orchestrator.run_fulfillment(&job).await.unwrap();
    assert_eq!(outcome, AttemptOutcome::Settled(OrderStatus::Failed));
    let failed = h.order(order.id).await;
    assert_eq!(failed.status, OrderStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("Invalid user id"));

    // Neither a retried job nor a late success callback revives it.
    let retried = h
        .orchestrator
        .run_fulfillment(&job.next_attempt())
        .await
        .unwrap();
    assert!(matches!(retried, AttemptOutcome::Skipped(_)));

    let callback = serde_json::json!({
        "trxid": MockProvider::provider_order_id(order.id),
        "ref_id": order.id.to_string(),
        "status": "success",
        "sn": "SN-LATE",
    })
    .to_string();
    let outcome = h
        .orchestrator
        .handle_provider_callback(None, callback.as_bytes())
        .await
        .unwrap();
    assert_eq!(outcome, WebhookOutcome::Ignored);

    let still = h.order(order.id).await;
    assert_eq!(still.status, OrderStatus::Failed);
    assert_eq!(still.voucher_code, None);
    assert_eq!(h.provider.fulfill_calls(order.id).await, 1);
}

#[tokio::test]
async fn rejected_request_fails_without_retry() {
    let mut h = Harness::new().await;
    h.provider
        .push_fulfill(MockOutcome::Rejected("insufficient balance".into()))
        .await;
    let order = h
        .orchestrator
        .create_order(&h.request("buyer@example.com"), None)
        .await
        .unwrap()
        .order;
    h.pay(&order).await;
    let job = h.next_job();

    let outcome = h.orchestrator.run_fulfillment(&job).await.unwrap();
    assert_eq!(outcome, AttemptOutcome::Settled(OrderStatus::Failed));
    let failed = h.order(order.id).await;
    assert!(
        failed
            .error_message
            .unwrap()
            .contains("insufficient balance")
    );
}

#[tokio::test]
async fn transient_failures_exhaust_to_failed() {
    let mut h = Harness::new().await;
    for _ in 0..3 {
        h.provider
            .push_fulfill(MockOutcome::Transient("gateway timeout".into()))
            .await;
    }
    let order = h
        .orchestrator
        .create_order(&h.request("buyer@example.com"), None)
        .await
        .unwrap()
        .order;
    h.pay(&order).await;
    let first = h.next_job();

    let outcome = h.orchestrator.run_fulfillment(&first).await.unwrap();
    assert_eq!(
        outcome,
        AttemptOutcome::Retry {
            delay: Duration::from_secs(2)
        }
    );
    assert_eq!(h.order(order.id).await.status, OrderStatus::Processing);

    let second = first.next_attempt();
    let outcome = h.orchestrator.run_fulfillment(&second).await.unwrap();
    assert_eq!(
        outcome,
        AttemptOutcome::Retry {
            delay: Duration::from_secs(4)
        }
    );

    let third = second.next_attempt();
    let outcome = h.orchestrator.run_fulfillment(&third).await.unwrap();
    assert_eq!(outcome, AttemptOutcome::Settled(OrderStatus::Failed));

    let failed = h.order(order.id).await;
    assert_eq!(failed.status, OrderStatus::Failed);
    assert_eq!(failed.fulfillment_attempts, 3);
    assert!(
        failed
            .error_message
            .unwrap()
            .starts_with("Fulfillment failed after 3 attempts")
    );
    assert_eq!(h.provider.fulfill_calls(order.id).await, 3);

    let attempts = h
        .store
        .logs_for_order(order.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|l| l.kind == LogKind::TopupResult)
        .count();
    assert_eq!(attempts, 3);
}

#[tokio::test]
async fn processing_order_settles_through_callback() {
    let mut h = Harness::new().await;
    h.provider.push_fulfill(MockOutcome::Processing).await;
    let order = h
        .orchestrator
        .create_order(&h.request("buyer@example.com"), None)
        .await
        .unwrap()
        .order;
    h.pay(&order).await;
    let job = h.next_job();

    let outcome = h.orchestrator.run_fulfillment(&job).await.unwrap();
    assert_eq!(outcome, AttemptOutcome::InFlight);
    let processing = h.order(order.id).await;
    assert_eq!(processing.status, OrderStatus::Processing);
    assert_eq!(processing.provider_status.as_deref(), Some("processing"));

    let callback = serde_json::json!({
        "trxid": MockProvider::provider_order_id(order.id),
        "status": "success",
        "sn": "SN123456",
    })
    .to_string();
    let first = h
        .orchestrator
        .handle_provider_callback(None, callback.as_bytes())
        .await
        .unwrap();
    let second = h
        .orchestrator
        .handle_provider_callback(None, callback.as_bytes())
        .await
        .unwrap();
    assert_eq!(first, WebhookOutcome::Processed);
    assert_eq!(second, WebhookOutcome::Duplicate);

    let done = h.order(order.id).await;
    assert_eq!(done.status, OrderStatus::Success);
    assert_eq!(done.voucher_code.as_deref(), Some("SN123456"));
    assert!(done.success_at.is_some());
}

#[tokio::test]
async fn signed_callback_policy_rejects_unsigned_callbacks() {
    let provider =
        MockProvider::new().with_callback_policy(CallbackPolicy::signed(b"cbsecret".to_vec()));
    let h = Harness::with_provider(provider).await;

    let callback = br#"{"trxid":"MOCK-1","status":"success"}"#;
    let err = h
        .orchestrator
        .handle_provider_callback(None, callback)
        .await
        .unwrap_err();
    assert!(matches!(err, WebhookError::InvalidSignature));

    let signature = tkl_sdk::signature::hmac_sha256_hex(callback, b"cbsecret").unwrap();
    let err = h
        .orchestrator
        .handle_provider_callback(Some(&signature), callback)
        .await
        .unwrap_err();
    assert!(matches!(err, WebhookError::OrderNotFound));

    let events = h.store.webhook_events().await;
    assert_eq!(events[0].outcome, WebhookEventOutcome::Rejected);
    assert_eq!(events[1].outcome, WebhookEventOutcome::Failed);
    assert_eq!(events[1].source, "provider:mock");
}

#[tokio::test]
async fn voucher_stock_is_claimed_once() {
    let mut h = Harness::new().await;
    h.store
        .add_voucher(h.voucher_denomination_id, "STEAM-AAAA-BBBB")
        .await;

    let first = h
        .orchestrator
        .create_order(&h.voucher_request("one@example.com"), None)
        .await
        .unwrap()
        .order;
    assert!(!first.payment_instructions.0.is_empty());
    h.pay(&first).await;
    let job = h.next_job();
    let outcome = h.orchestrator.run_fulfillment(&job).await.unwrap();
    assert_eq!(outcome, AttemptOutcome::Settled(OrderStatus::Success));
    let delivered = h.order(first.id).await;
    assert_eq!(delivered.voucher_code.as_deref(), Some("STEAM-AAAA-BBBB"));
    assert_eq!(h.provider.fulfill_calls(first.id).await, 0);

    let second = h
        .orchestrator
        .create_order(&h.voucher_request("two@example.com"), None)
        .await
        .unwrap()
        .order;
    h.pay(&second).await;
    let job = h.next_job();
    let outcome = h.orchestrator.run_fulfillment(&job).await.unwrap();
    assert_eq!(outcome, AttemptOutcome::Settled(OrderStatus::Failed));
    let failed = h.order(second.id).await;
    assert_eq!(
        failed.error_message.as_deref(),
        Some("Voucher stock exhausted")
    );
}

#[tokio::test]
async fn invoice_failure_keeps_order_resumable() {
    let h = Harness::new().await;
    h.gateway.fail_next_invoices(1);
    let request = h.request("buyer@example.com");

    let err = h.orchestrator.create_order(&request, None).await.unwrap_err();
    let code = err.order_code().unwrap().to_string();
    assert!(matches!(err, OrderError::InvoiceFailed { .. }));

    let pending = h
        .orchestrator
        .lookup_order(&code.to_lowercase(), "BUYER@example.com")
        .await
        .unwrap();
    assert_eq!(pending.status, OrderStatus::Pending);
    assert!(pending.payment_ref.is_none());

    let resumed = h
        .orchestrator
        .resume_checkout(&code, "buyer@example.com")
        .await
        .unwrap();
    assert_eq!(resumed.id, pending.id);
    assert_eq!(resumed.status, OrderStatus::WaitingPayment);
    assert!(resumed.payment_ref.is_some());

    // Resuming again hands back the same invoice.
    let again = h
        .orchestrator
        .resume_checkout(&code, "buyer@example.com")
        .await
        .unwrap();
    assert_eq!(again.payment_ref, resumed.payment_ref);
    assert_eq!(h.store.order_count().await, 1);
}

#[tokio::test]
async fn lookup_requires_matching_email() {
    let h = Harness::new().await;
    let order = h
        .orchestrator
        .create_order(&h.request("buyer@example.com"), None)
        .await
        .unwrap()
        .order;

    let err = h
        .orchestrator
        .lookup_order(&order.code, "someone@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::NotFound("Order")));
}

#[tokio::test]
async fn checkout_validates_target_and_contact() {
    let h = Harness::new().await;

    let mut wrong_kind = h.request("buyer@example.com");
    wrong_kind.target = Target::Phone {
        number: "081234567890".into(),
    };
    let err = h.orchestrator.create_order(&wrong_kind, None).await.unwrap_err();
    assert!(matches!(err, OrderError::Validation { field: "target", .. }));

    let err = h
        .orchestrator
        .create_order(&h.request("not-an-email"), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::Validation {
            field: "contactEmail",
            ..
        }
    ));

    let mut unknown = h.request("buyer@example.com");
    unknown.denomination_id = uuid::Uuid::new_v4();
    let err = h.orchestrator.create_order(&unknown, None).await.unwrap_err();
    assert!(matches!(err, OrderError::NotFound("Denomination")));
    assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn slow_target_verification_times_out() {
    let provider = MockProvider::new().with_verify_delay(Duration::from_secs(30));
    let h = Harness::with(provider, checkout_config()).await;
    let target = Target::GameAccount {
        uid: "12345678".into(),
        zone_id: Some("2001".into()),
    };

    let response = h
        .orchestrator
        .verify_target(h.product_id, &target)
        .await
        .unwrap();
    assert!(!response.valid);
    assert_eq!(response.error.as_deref(), Some("verification timed out"));
}

#[tokio::test]
async fn target_verification_returns_display_name() {
    let h = Harness::new().await;
    h.provider.set_display_name("12345678", "Player One").await;
    let target = Target::GameAccount {
        uid: "12345678".into(),
        zone_id: Some("2001".into()),
    };
    let response = h
        .orchestrator
        .verify_target(h.product_id, &target)
        .await
        .unwrap();
    assert!(response.valid);
    assert_eq!(response.display_name.as_deref(), Some("Player One"));
}
