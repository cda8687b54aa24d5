use kanau::processor::Processor;
use tkl_sdk::objects::WebhookOutcome;

use crate::framework::DatabaseProcessor;

/// How an inbound webhook call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE", type_name = "webhook_outcome")]
pub enum WebhookEventOutcome {
    Received,
    Processed,
    Duplicate,
    Ignored,
    Rejected,
    Failed,
}

impl From<WebhookOutcome> for WebhookEventOutcome {
    fn from(outcome: WebhookOutcome) -> Self {
        match outcome {
            WebhookOutcome::Processed => WebhookEventOutcome::Processed,
            WebhookOutcome::Duplicate => WebhookEventOutcome::Duplicate,
            WebhookOutcome::Ignored => WebhookEventOutcome::Ignored,
        }
    }
}

/// Record of one inbound webhook call, kept for replay diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct WebhookEvent {
    pub id: i64,
    /// `payment:<gateway>` or `provider:<provider>`.
    pub source: String,
    pub external_id: Option<String>,
    pub signature: Option<String>,
    pub payload: String,
    pub outcome: WebhookEventOutcome,
    pub error: Option<String>,
    pub received_at: time::PrimitiveDateTime,
    pub processed_at: Option<time::PrimitiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct WebhookEventInsert {
    pub source: String,
    pub external_id: Option<String>,
    pub signature: Option<String>,
    pub payload: String,
}

impl Processor<WebhookEventInsert> for DatabaseProcessor {
    type Output = i64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertWebhookEvent")]
    async fn process(&self, insert: WebhookEventInsert) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO webhook_events (source, external_id, signature, payload, outcome)
            VALUES ($1, $2, $3, $4, 'RECEIVED')
            RETURNING id
            "#,
        )
        .bind(insert.source)
        .bind(insert.external_id)
        .bind(insert.signature)
        .bind(insert.payload)
        .fetch_one(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Stamp the final outcome on a recorded webhook.
pub struct FinishWebhookEvent {
    pub id: i64,
    pub external_id: Option<String>,
    pub outcome: WebhookEventOutcome,
    pub error: Option<String>,
}

impl Processor<FinishWebhookEvent> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:FinishWebhookEvent")]
    async fn process(&self, cmd: FinishWebhookEvent) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE webhook_events
            SET outcome = $2,
                error = $3,
                external_id = COALESCE($4, external_id),
                processed_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(cmd.id)
        .bind(cmd.outcome)
        .bind(cmd.error)
        .bind(cmd.external_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
