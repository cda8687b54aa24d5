//! In-memory wiring shared by the processor tests.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;
use tkl_sdk::objects::{PriceBreakdown, Target};
use uuid::Uuid;

use crate::config::{CheckoutConfig, FulfillmentConfig, MockGatewayConfig};
use crate::entities::catalog::{DeliveryKind, Denomination, Product};
use crate::entities::order::{Order, OrderInsert, OrderPatch};
use crate::entities::{OrderStatus, ProductCategory};
use crate::events::{FulfillmentJobReceiver, FulfillmentJobSender, fulfillment_channel};
use crate::gateways::MockGateway;
use crate::orchestrator::Orchestrator;
use crate::providers::MockProvider;
use crate::store::{CreateOutcome, InMemoryStore, OrderStore};

pub struct Rig {
    pub store: Arc<InMemoryStore>,
    pub provider: Arc<MockProvider>,
    pub orchestrator: Arc<Orchestrator>,
    pub job_tx: FulfillmentJobSender,
    product_id: Uuid,
    denomination_id: Uuid,
}

impl Rig {
    /// The receiver is the queue a worker would consume.
    pub async fn new(
        provider: MockProvider,
        fulfillment: FulfillmentConfig,
    ) -> (Self, FulfillmentJobReceiver) {
        let store = Arc::new(InMemoryStore::new());
        let provider = Arc::new(provider);
        let gateway = Arc::new(MockGateway::new(MockGatewayConfig {
            public_base_url: url::Url::parse("http://localhost:3000/").unwrap(),
            webhook_secret: b"whsec_worker".to_vec().into_boxed_slice(),
        }));
        let (job_tx, job_rx) = fulfillment_channel();
        let orchestrator = Arc::new(Orchestrator::new(
            store.clone(),
            gateway,
            provider.clone(),
            job_tx.clone(),
            CheckoutConfig::local().unwrap(),
            fulfillment,
        ));

        let product_id = Uuid::new_v4();
        let denomination_id = Uuid::new_v4();
        store
            .insert_product(Product {
                id: product_id,
                slug: "free-fire".into(),
                name: "Free Fire".into(),
                category: ProductCategory::Game,
                delivery: DeliveryKind::Provider,
                provider_code: Some("FF".into()),
                is_active: true,
            })
            .await;
        store
            .insert_denomination(Denomination {
                id: denomination_id,
                product_id,
                label: "140 Diamonds".into(),
                amount: 140,
                sell_price: 20_000,
                cost_price: 19_000,
                fee_flat: 0,
                fee_pct: Decimal::ZERO,
                sort_order: 1,
                is_popular: false,
                provider_code: Some("FF140".into()),
                is_active: true,
            })
            .await;

        let rig = Self {
            store,
            provider,
            orchestrator,
            job_tx,
            product_id,
            denomination_id,
        };
        (rig, job_rx)
    }

    /// Insert an order and mark it PAID without going through the gateway.
    pub async fn paid_order(&self) -> Order {
        let id = Uuid::new_v4();
        let insert = OrderInsert {
            id,
            code: format!("TKL{}", &id.simple().to_string()[..7].to_ascii_uppercase()),
            product_id: self.product_id,
            denomination_id: self.denomination_id,
            target: Target::GameAccount {
                uid: "87654321".into(),
                zone_id: None,
            },
            contact_email: "buyer@example.com".into(),
            contact_whatsapp: "081234567890".into(),
            payment_method: "QRIS".into(),
            gateway: "mock".into(),
            price: PriceBreakdown {
                base_price: 20_000,
                fee_flat: 0,
                fee_pct: 0,
                promo_discount: 0,
                total: 20_000,
            },
            promo_id: None,
            idempotency_key: format!("key-{id}"),
        };
        let created = self.store.create_order(insert, json!({})).await.unwrap();
        assert!(matches!(created, CreateOutcome::Created(_)));
        self.store
            .transition(id, &[OrderStatus::Pending], OrderStatus::Paid, OrderPatch::default())
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn order(&self, id: Uuid) -> Order {
        self.store.order(id).await.unwrap().unwrap()
    }
}
