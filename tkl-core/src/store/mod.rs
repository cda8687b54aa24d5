//! Persistence seam for the order lifecycle.
//!
//! [`PgOrderStore`] runs the SQL processors from `entities`;
//! [`InMemoryStore`] keeps the same contract in process for tests.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgOrderStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::OrderStatus;
use crate::entities::catalog::{Denomination, Product};
use crate::entities::order::{Order, OrderInsert, OrderPatch, StaleCutoff};
use crate::entities::promo::Promo;
use crate::entities::transaction_log::{TransactionLog, TransactionLogInsert};
use crate::entities::webhook_event::{FinishWebhookEvent, WebhookEventInsert};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// The promo hit its usage limit (or left its window) while the order was
    /// being written. Nothing was persisted.
    #[error("promo usage limit reached")]
    PromoExhausted,
    /// The generated order code is already taken. Nothing was persisted.
    #[error("order code already in use")]
    CodeConflict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(Order),
    /// An order with the same idempotency key already existed.
    Existing(Order),
}

impl CreateOutcome {
    pub fn order(&self) -> &Order {
        match self {
            CreateOutcome::Created(order) | CreateOutcome::Existing(order) => order,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            CreateOutcome::Created(order) | CreateOutcome::Existing(order) => order,
        }
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn product(&self, id: Uuid) -> Result<Option<Product>, StoreError>;

    async fn denomination(&self, id: Uuid) -> Result<Option<Denomination>, StoreError>;

    async fn promo_by_code(&self, code: &str) -> Result<Option<Promo>, StoreError>;

    async fn order(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    async fn order_by_code(&self, code: &str) -> Result<Option<Order>, StoreError>;

    async fn order_by_idempotency_key(&self, key: &str) -> Result<Option<Order>, StoreError>;

    async fn order_by_payment_ref(
        &self,
        gateway: &str,
        payment_ref: &str,
    ) -> Result<Option<Order>, StoreError>;

    async fn order_by_provider_order_id(
        &self,
        provider_order_id: &str,
    ) -> Result<Option<Order>, StoreError>;

    /// Insert the order, redeem its promo and write the ORDER_CREATED log as
    /// one unit. An existing idempotency key short-circuits to
    /// [`CreateOutcome::Existing`] without touching the promo.
    async fn create_order(
        &self,
        insert: OrderInsert,
        log_payload: serde_json::Value,
    ) -> Result<CreateOutcome, StoreError>;

    /// Move the order to `to` only while its status is one of `from`.
    ///
    /// `None` means the order was missing or another writer got there first.
    async fn transition(
        &self,
        order_id: Uuid,
        from: &[OrderStatus],
        to: OrderStatus,
        patch: OrderPatch,
    ) -> Result<Option<Order>, StoreError>;

    /// Bind an available voucher of `denomination_id` to the order and return
    /// its code. Repeated calls for one order return the same code.
    async fn claim_voucher(
        &self,
        denomination_id: Uuid,
        order_id: Uuid,
    ) -> Result<Option<String>, StoreError>;

    async fn append_log(&self, entry: TransactionLogInsert) -> Result<(), StoreError>;

    async fn logs_for_order(&self, order_id: Uuid) -> Result<Vec<TransactionLog>, StoreError>;

    async fn record_webhook(&self, event: WebhookEventInsert) -> Result<i64, StoreError>;

    async fn finish_webhook(&self, finish: FinishWebhookEvent) -> Result<(), StoreError>;

    /// Oldest-first orders in `statuses` that pass `cutoff`, at most `limit`.
    async fn orders_in_status(
        &self,
        statuses: &[OrderStatus],
        cutoff: StaleCutoff,
        limit: i64,
    ) -> Result<Vec<Order>, StoreError>;
}
