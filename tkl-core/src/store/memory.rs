use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::types::Json;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CreateOutcome, OrderStore, StoreError};
use crate::entities::OrderStatus;
use crate::entities::catalog::{Denomination, Product};
use crate::entities::order::{Order, OrderInsert, OrderPatch, StaleCutoff};
use crate::entities::promo::Promo;
use crate::entities::transaction_log::{LogKind, TransactionLog, TransactionLogInsert};
use crate::entities::voucher::{VoucherStatus, VoucherStock};
use crate::entities::webhook_event::{
    FinishWebhookEvent, WebhookEvent, WebhookEventInsert, WebhookEventOutcome,
};
use crate::utils::clock::now;

#[derive(Default)]
struct Inner {
    products: HashMap<Uuid, Product>,
    denominations: HashMap<Uuid, Denomination>,
    promos: HashMap<Uuid, Promo>,
    orders: HashMap<Uuid, Order>,
    vouchers: Vec<VoucherStock>,
    logs: Vec<TransactionLog>,
    webhooks: Vec<WebhookEvent>,
}

/// [`OrderStore`] kept in process behind one lock.
///
/// Every operation runs under the lock, so multi-step units such as
/// `create_order` are atomic in the same way the Postgres transactions are.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_product(&self, product: Product) {
        self.inner.lock().await.products.insert(product.id, product);
    }

    pub async fn insert_denomination(&self, denomination: Denomination) {
        self.inner
            .lock()
            .await
            .denominations
            .insert(denomination.id, denomination);
    }

    pub async fn insert_promo(&self, promo: Promo) {
        self.inner.lock().await.promos.insert(promo.id, promo);
    }

    pub async fn add_voucher(&self, denomination_id: Uuid, code: &str) {
        self.inner.lock().await.vouchers.push(VoucherStock {
            id: Uuid::new_v4(),
            denomination_id,
            code: code.to_string(),
            status: VoucherStatus::Available,
            order_id: None,
            used_at: None,
        });
    }

    pub async fn promo(&self, id: Uuid) -> Option<Promo> {
        self.inner.lock().await.promos.get(&id).cloned()
    }

    pub async fn order_count(&self) -> usize {
        self.inner.lock().await.orders.len()
    }

    pub async fn webhook_events(&self) -> Vec<WebhookEvent> {
        self.inner.lock().await.webhooks.clone()
    }

    pub async fn vouchers(&self) -> Vec<VoucherStock> {
        self.inner.lock().await.vouchers.clone()
    }

    /// Backdate an order, for exercising age-based sweeps.
    pub async fn set_updated_at(&self, order_id: Uuid, at: time::PrimitiveDateTime) {
        if let Some(order) = self.inner.lock().await.orders.get_mut(&order_id) {
            order.updated_at = at;
        }
    }
}

impl Inner {
    fn find_order(&self, pred: impl Fn(&Order) -> bool) -> Option<Order> {
        self.orders.values().find(|o| pred(o)).cloned()
    }

    fn push_log(&mut self, entry: TransactionLogInsert) {
        let id = self.logs.len() as i64 + 1;
        self.logs.push(TransactionLog {
            id,
            order_id: entry.order_id,
            kind: entry.kind,
            payload: Json(entry.payload),
            created_at: now(),
        });
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.inner.lock().await.products.get(&id).cloned())
    }

    async fn denomination(&self, id: Uuid) -> Result<Option<Denomination>, StoreError> {
        Ok(self.inner.lock().await.denominations.get(&id).cloned())
    }

    async fn promo_by_code(&self, code: &str) -> Result<Option<Promo>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .promos
            .values()
            .find(|p| p.code.eq_ignore_ascii_case(code))
            .cloned())
    }

    async fn order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.inner.lock().await.orders.get(&id).cloned())
    }

    async fn order_by_code(&self, code: &str) -> Result<Option<Order>, StoreError> {
        Ok(self.inner.lock().await.find_order(|o| o.code == code))
    }

    async fn order_by_idempotency_key(&self, key: &str) -> Result<Option<Order>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .find_order(|o| o.idempotency_key == key))
    }

    async fn order_by_payment_ref(
        &self,
        gateway: &str,
        payment_ref: &str,
    ) -> Result<Option<Order>, StoreError> {
        Ok(self.inner.lock().await.find_order(|o| {
            o.gateway == gateway && o.payment_ref.as_deref() == Some(payment_ref)
        }))
    }

    async fn order_by_provider_order_id(
        &self,
        provider_order_id: &str,
    ) -> Result<Option<Order>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .find_order(|o| o.provider_order_id.as_deref() == Some(provider_order_id)))
    }

    async fn create_order(
        &self,
        insert: OrderInsert,
        log_payload: serde_json::Value,
    ) -> Result<CreateOutcome, StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner.find_order(|o| o.idempotency_key == insert.idempotency_key) {
            return Ok(CreateOutcome::Existing(existing));
        }
        if inner.orders.values().any(|o| o.code == insert.code) {
            return Err(StoreError::CodeConflict);
        }

        let at = now();
        if let Some(promo_id) = insert.promo_id {
            let redeemable = inner.promos.get(&promo_id).is_some_and(|p| {
                p.is_active && p.start_at <= at && at <= p.end_at && p.has_capacity()
            });
            if !redeemable {
                return Err(StoreError::PromoExhausted);
            }
            if let Some(promo) = inner.promos.get_mut(&promo_id) {
                promo.used_count += 1;
            }
        }

        let order = insert.into_order(at);
        inner.orders.insert(order.id, order.clone());
        inner.push_log(TransactionLogInsert::new(
            order.id,
            LogKind::OrderCreated,
            log_payload,
        ));
        Ok(CreateOutcome::Created(order))
    }

    async fn transition(
        &self,
        order_id: Uuid,
        from: &[OrderStatus],
        to: OrderStatus,
        patch: OrderPatch,
    ) -> Result<Option<Order>, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(order) = inner.orders.get_mut(&order_id) else {
            return Ok(None);
        };
        if !from.contains(&order.status) || !patch.allows(order) {
            return Ok(None);
        }
        patch.apply(order, to, now());
        Ok(Some(order.clone()))
    }

    async fn claim_voucher(
        &self,
        denomination_id: Uuid,
        order_id: Uuid,
    ) -> Result<Option<String>, StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(bound) = inner
            .vouchers
            .iter()
            .find(|v| v.order_id == Some(order_id))
        {
            return Ok(Some(bound.code.clone()));
        }
        let Some(voucher) = inner
            .vouchers
            .iter_mut()
            .find(|v| v.denomination_id == denomination_id && v.status == VoucherStatus::Available)
        else {
            return Ok(None);
        };
        voucher.status = VoucherStatus::Used;
        voucher.order_id = Some(order_id);
        voucher.used_at = Some(now());
        Ok(Some(voucher.code.clone()))
    }

    async fn append_log(&self, entry: TransactionLogInsert) -> Result<(), StoreError> {
        self.inner.lock().await.push_log(entry);
        Ok(())
    }

    async fn logs_for_order(&self, order_id: Uuid) -> Result<Vec<TransactionLog>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .logs
            .iter()
            .filter(|l| l.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn record_webhook(&self, event: WebhookEventInsert) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().await;
        let id = inner.webhooks.len() as i64 + 1;
        inner.webhooks.push(WebhookEvent {
            id,
            source: event.source,
            external_id: event.external_id,
            signature: event.signature,
            payload: event.payload,
            outcome: WebhookEventOutcome::Received,
            error: None,
            received_at: now(),
            processed_at: None,
        });
        Ok(id)
    }

    async fn finish_webhook(&self, finish: FinishWebhookEvent) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(event) = inner.webhooks.iter_mut().find(|w| w.id == finish.id) {
            event.outcome = finish.outcome;
            event.error = finish.error;
            if finish.external_id.is_some() {
                event.external_id = finish.external_id;
            }
            event.processed_at = Some(now());
        }
        Ok(())
    }

    async fn orders_in_status(
        &self,
        statuses: &[OrderStatus],
        cutoff: StaleCutoff,
        limit: i64,
    ) -> Result<Vec<Order>, StoreError> {
        let inner = self.inner.lock().await;
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| statuses.contains(&o.status) && cutoff.matches(o))
            .cloned()
            .collect();
        orders.sort_by_key(|o| match cutoff {
            StaleCutoff::UpdatedBefore(_) => Some(o.updated_at),
            StaleCutoff::InvoiceExpiredBefore(_) => o.payment_expires_at,
        });
        orders.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(orders)
    }
}
