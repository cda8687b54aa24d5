//! Shared fixtures: an orchestrator wired to the in-memory store, the mock
//! gateway and a scripted provider.

#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use tkl_core::config::{CheckoutConfig, FulfillmentConfig, MockGatewayConfig};
use tkl_core::entities::catalog::{DeliveryKind, Denomination, Product};
use tkl_core::entities::order::Order;
use tkl_core::entities::promo::Promo;
use tkl_core::entities::{DiscountType, ProductCategory};
use tkl_core::events::{FulfillmentJob, FulfillmentJobReceiver, fulfillment_channel};
use tkl_core::gateways::{InvoiceStatus, MockGateway};
use tkl_core::orchestrator::Orchestrator;
use tkl_core::providers::{CallbackPolicy, MockProvider};
use tkl_core::store::{InMemoryStore, OrderStore};
use tkl_core::utils::clock::now;
use tkl_sdk::objects::webhook::INVOICE_PAID;
use tkl_sdk::objects::{CreateOrderRequest, Target, WebhookOutcome};
use uuid::Uuid;

pub const WEBHOOK_SECRET: &[u8] = b"whsec_test";

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub gateway: Arc<MockGateway>,
    pub provider: Arc<MockProvider>,
    pub orchestrator: Arc<Orchestrator>,
    pub jobs: FulfillmentJobReceiver,
    pub product_id: Uuid,
    pub denomination_id: Uuid,
    pub voucher_product_id: Uuid,
    pub voucher_denomination_id: Uuid,
}

pub fn checkout_config() -> CheckoutConfig {
    CheckoutConfig::local().unwrap()
}

impl Harness {
    pub async fn new() -> Self {
        let provider = MockProvider::new().with_callback_policy(CallbackPolicy::unsigned());
        Self::with(provider, checkout_config()).await
    }

    pub async fn with_provider(provider: MockProvider) -> Self {
        Self::with(provider, checkout_config()).await
    }

    pub async fn with(provider: MockProvider, checkout: CheckoutConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(MockGateway::new(MockGatewayConfig {
            public_base_url: url::Url::parse("http://localhost:8080/").unwrap(),
            webhook_secret: WEBHOOK_SECRET.to_vec().into_boxed_slice(),
        }));
        let provider = Arc::new(provider);
        let (tx, rx) = fulfillment_channel();
        let orchestrator = Arc::new(Orchestrator::new(
            store.clone(),
            gateway.clone(),
            provider.clone(),
            tx,
            checkout,
            FulfillmentConfig::default(),
        ));

        let product_id = Uuid::new_v4();
        let denomination_id = Uuid::new_v4();
        store
            .insert_product(Product {
                id: product_id,
                slug: "mobile-legends".into(),
                name: "Mobile Legends".into(),
                category: ProductCategory::Game,
                delivery: DeliveryKind::Provider,
                provider_code: Some("ML".into()),
                is_active: true,
            })
            .await;
        store
            .insert_denomination(Denomination {
                id: denomination_id,
                product_id,
                label: "86 Diamonds".into(),
                amount: 86,
                sell_price: 50_000,
                cost_price: 47_500,
                fee_flat: 1_000,
                fee_pct: Decimal::ZERO,
                sort_order: 1,
                is_popular: true,
                provider_code: Some("ML86".into()),
                is_active: true,
            })
            .await;

        let voucher_product_id = Uuid::new_v4();
        let voucher_denomination_id = Uuid::new_v4();
        store
            .insert_product(Product {
                id: voucher_product_id,
                slug: "steam-wallet".into(),
                name: "Steam Wallet".into(),
                category: ProductCategory::Voucher,
                delivery: DeliveryKind::VoucherStock,
                provider_code: None,
                is_active: true,
            })
            .await;
        store
            .insert_denomination(Denomination {
                id: voucher_denomination_id,
                product_id: voucher_product_id,
                label: "IDR 60.000".into(),
                amount: 60_000,
                sell_price: 60_000,
                cost_price: 57_000,
                fee_flat: 0,
                fee_pct: Decimal::ZERO,
                sort_order: 1,
                is_popular: false,
                provider_code: None,
                is_active: true,
            })
            .await;

        Self {
            store,
            gateway,
            provider,
            orchestrator,
            jobs: rx,
            product_id,
            denomination_id,
            voucher_product_id,
            voucher_denomination_id,
        }
    }

    /// Checkout for the game product, distinct per `email`.
    pub fn request(&self, email: &str) -> CreateOrderRequest {
        CreateOrderRequest {
            product_id: self.product_id,
            denomination_id: self.denomination_id,
            target: Target::GameAccount {
                uid: "12345678".into(),
                zone_id: Some("2001".into()),
            },
            contact_email: email.into(),
            contact_whatsapp: "081234567890".into(),
            promo_code: None,
            payment_method: "QRIS".into(),
        }
    }

    pub fn voucher_request(&self, email: &str) -> CreateOrderRequest {
        CreateOrderRequest {
            product_id: self.voucher_product_id,
            denomination_id: self.voucher_denomination_id,
            target: Target::Email {
                email: email.into(),
            },
            contact_email: email.into(),
            contact_whatsapp: "081234567890".into(),
            promo_code: None,
            payment_method: "BCA_VA".into(),
        }
    }

    pub async fn add_promo(&self, code: &str, discount_type: DiscountType, value: i64) -> Promo {
        let promo = Promo {
            id: Uuid::new_v4(),
            code: code.into(),
            discount_type,
            value: Decimal::from(value),
            max_discount: None,
            min_purchase: None,
            start_at: now() - time::Duration::days(1),
            end_at: now() + time::Duration::days(1),
            usage_limit: None,
            used_count: 0,
            is_active: true,
        };
        self.store.insert_promo(promo.clone()).await;
        promo
    }

    pub async fn order(&self, id: Uuid) -> Order {
        self.store.order(id).await.unwrap().unwrap()
    }

    /// Signed `invoice.paid` webhook for the order's invoice, as the gateway sends it.
    pub async fn paid_webhook(&self, order: &Order) -> (String, String) {
        let invoice_id = order.payment_ref.clone().unwrap();
        assert!(self.gateway.settle(&invoice_id, InvoiceStatus::Paid).await);
        self.gateway
            .signed_webhook(&invoice_id, INVOICE_PAID)
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn pay(&self, order: &Order) -> WebhookOutcome {
        let (signature, body) = self.paid_webhook(order).await;
        self.orchestrator
            .handle_payment_webhook(Some(&signature), body.as_bytes())
            .await
            .unwrap()
    }

    pub fn next_job(&mut self) -> FulfillmentJob {
        self.jobs.try_recv().unwrap()
    }

    pub fn no_job(&mut self) -> bool {
        self.jobs.try_recv().is_err()
    }
}
