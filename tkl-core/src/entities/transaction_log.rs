use kanau::processor::Processor;
use sqlx::types::Json;
use uuid::Uuid;

use crate::framework::DatabaseProcessor;

/// Audit entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE", type_name = "transaction_log_kind")]
pub enum LogKind {
    OrderCreated,
    InvoiceIssued,
    InvoiceFailed,
    PaymentReceived,
    PaymentExpired,
    PaymentFailed,
    FulfillmentStarted,
    TopupResult,
    ProviderCallback,
    Reconciled,
}

/// Append-only audit record. Rows are never updated or deleted.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct TransactionLog {
    pub id: i64,
    pub order_id: Uuid,
    pub kind: LogKind,
    pub payload: Json<serde_json::Value>,
    pub created_at: time::PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub struct TransactionLogInsert {
    pub order_id: Uuid,
    pub kind: LogKind,
    pub payload: serde_json::Value,
}

impl TransactionLogInsert {
    pub fn new(order_id: Uuid, kind: LogKind, payload: serde_json::Value) -> Self {
        Self {
            order_id,
            kind,
            payload,
        }
    }
}

impl TransactionLog {
    pub async fn insert_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        insert: TransactionLogInsert,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO transaction_logs (order_id, kind, payload) VALUES ($1, $2, $3)")
            .bind(insert.order_id)
            .bind(insert.kind)
            .bind(Json(insert.payload))
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

impl Processor<TransactionLogInsert> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertTransactionLog")]
    async fn process(&self, insert: TransactionLogInsert) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO transaction_logs (order_id, kind, payload) VALUES ($1, $2, $3)")
            .bind(insert.order_id)
            .bind(insert.kind)
            .bind(Json(insert.payload))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct GetLogsForOrder {
    pub order_id: Uuid,
}

impl Processor<GetLogsForOrder> for DatabaseProcessor {
    type Output = Vec<TransactionLog>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetLogsForOrder")]
    async fn process(&self, query: GetLogsForOrder) -> Result<Vec<TransactionLog>, sqlx::Error> {
        sqlx::query_as::<_, TransactionLog>(
            r#"
            SELECT id, order_id, kind, payload, created_at
            FROM transaction_logs
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(query.order_id)
        .fetch_all(&self.pool)
        .await
    }
}
