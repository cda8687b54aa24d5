use async_trait::async_trait;
use kanau::processor::Processor;
use sqlx::PgPool;
use uuid::Uuid;

use super::{CreateOutcome, OrderStore, StoreError};
use crate::entities::OrderStatus;
use crate::entities::catalog::{Denomination, GetDenominationById, GetProductById, Product};
use crate::entities::order::{
    GetOrderByCode, GetOrderById, GetOrderByIdempotencyKey, GetOrderByPaymentRef,
    GetOrderByProviderOrderId, GetOrdersInStatus, Order, OrderInsert, OrderPatch, StaleCutoff,
    TransitionOrder,
};
use crate::entities::promo::{GetPromoByCode, Promo};
use crate::entities::transaction_log::{
    GetLogsForOrder, LogKind, TransactionLog, TransactionLogInsert,
};
use crate::entities::voucher::VoucherStock;
use crate::entities::webhook_event::{FinishWebhookEvent, WebhookEventInsert};
use crate::framework::DatabaseProcessor;
use crate::utils::clock::now;

const ORDER_CODE_CONSTRAINT: &str = "orders_code_key";

/// [`OrderStore`] over Postgres.
#[derive(Clone)]
pub struct PgOrderStore {
    db: DatabaseProcessor,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            db: DatabaseProcessor::new(pool),
        }
    }

    pub fn processor(&self) -> &DatabaseProcessor {
        &self.db
    }
}

fn is_code_conflict(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|e| e.constraint())
        .is_some_and(|c| c == ORDER_CODE_CONSTRAINT)
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.db.process(GetProductById { product_id: id }).await?)
    }

    async fn denomination(&self, id: Uuid) -> Result<Option<Denomination>, StoreError> {
        Ok(self
            .db
            .process(GetDenominationById {
                denomination_id: id,
            })
            .await?)
    }

    async fn promo_by_code(&self, code: &str) -> Result<Option<Promo>, StoreError> {
        Ok(self
            .db
            .process(GetPromoByCode {
                code: code.to_string(),
            })
            .await?)
    }

    async fn order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.db.process(GetOrderById { order_id: id }).await?)
    }

    async fn order_by_code(&self, code: &str) -> Result<Option<Order>, StoreError> {
        Ok(self
            .db
            .process(GetOrderByCode {
                code: code.to_string(),
            })
            .await?)
    }

    async fn order_by_idempotency_key(&self, key: &str) -> Result<Option<Order>, StoreError> {
        Ok(self
            .db
            .process(GetOrderByIdempotencyKey {
                key: key.to_string(),
            })
            .await?)
    }

    async fn order_by_payment_ref(
        &self,
        gateway: &str,
        payment_ref: &str,
    ) -> Result<Option<Order>, StoreError> {
        Ok(self
            .db
            .process(GetOrderByPaymentRef {
                gateway: gateway.to_string(),
                payment_ref: payment_ref.to_string(),
            })
            .await?)
    }

    async fn order_by_provider_order_id(
        &self,
        provider_order_id: &str,
    ) -> Result<Option<Order>, StoreError> {
        Ok(self
            .db
            .process(GetOrderByProviderOrderId {
                provider_order_id: provider_order_id.to_string(),
            })
            .await?)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:CreateOrder")]
    async fn create_order(
        &self,
        insert: OrderInsert,
        log_payload: serde_json::Value,
    ) -> Result<CreateOutcome, StoreError> {
        let key = insert.idempotency_key.clone();
        let promo_id = insert.promo_id;
        let mut tx = self.db.pool.begin().await?;

        let inserted = match Order::insert_tx(&mut tx, insert).await {
            Ok(row) => row,
            Err(e) if is_code_conflict(&e) => return Err(StoreError::CodeConflict),
            Err(e) => return Err(e.into()),
        };
        let Some(order) = inserted else {
            tx.rollback().await?;
            let existing = self
                .db
                .process(GetOrderByIdempotencyKey { key })
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            return Ok(CreateOutcome::Existing(existing));
        };

        if let Some(promo_id) = promo_id {
            if !Promo::redeem_tx(&mut tx, promo_id, now()).await? {
                tx.rollback().await?;
                return Err(StoreError::PromoExhausted);
            }
        }

        TransactionLog::insert_tx(
            &mut tx,
            TransactionLogInsert::new(order.id, LogKind::OrderCreated, log_payload),
        )
        .await?;
        tx.commit().await?;
        Ok(CreateOutcome::Created(order))
    }

    async fn transition(
        &self,
        order_id: Uuid,
        from: &[OrderStatus],
        to: OrderStatus,
        patch: OrderPatch,
    ) -> Result<Option<Order>, StoreError> {
        Ok(self
            .db
            .process(TransitionOrder {
                order_id,
                from: from.to_vec(),
                to,
                patch,
                at: now(),
            })
            .await?)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:ClaimVoucher")]
    async fn claim_voucher(
        &self,
        denomination_id: Uuid,
        order_id: Uuid,
    ) -> Result<Option<String>, StoreError> {
        let mut tx = self.db.pool.begin().await?;
        let claimed = VoucherStock::claim_tx(&mut tx, denomination_id, order_id).await?;
        tx.commit().await?;
        Ok(claimed.map(|v| v.code))
    }

    async fn append_log(&self, entry: TransactionLogInsert) -> Result<(), StoreError> {
        Ok(self.db.process(entry).await?)
    }

    async fn logs_for_order(&self, order_id: Uuid) -> Result<Vec<TransactionLog>, StoreError> {
        Ok(self.db.process(GetLogsForOrder { order_id }).await?)
    }

    async fn record_webhook(&self, event: WebhookEventInsert) -> Result<i64, StoreError> {
        Ok(self.db.process(event).await?)
    }

    async fn finish_webhook(&self, finish: FinishWebhookEvent) -> Result<(), StoreError> {
        Ok(self.db.process(finish).await?)
    }

    async fn orders_in_status(
        &self,
        statuses: &[OrderStatus],
        cutoff: StaleCutoff,
        limit: i64,
    ) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .db
            .process(GetOrdersInStatus {
                statuses: statuses.to_vec(),
                cutoff,
                limit,
            })
            .await?)
    }
}
