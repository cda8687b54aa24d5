use kanau::processor::Processor;
use rust_decimal::Decimal;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::entities::DiscountType;
use crate::framework::DatabaseProcessor;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Promo {
    pub id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    /// Percentage points for `Percent`, currency units for `Flat`.
    pub value: Decimal,
    pub max_discount: Option<i64>,
    pub min_purchase: Option<i64>,
    pub start_at: PrimitiveDateTime,
    pub end_at: PrimitiveDateTime,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
}

impl Promo {
    pub fn has_capacity(&self) -> bool {
        self.usage_limit
            .is_none_or(|limit| self.used_count < limit)
    }

    /// Increment `used_count` only while it stays within `usage_limit`.
    ///
    /// Returns `false` when the promo is exhausted or no longer valid at `now`;
    /// the caller must then abort the surrounding transaction.
    pub async fn redeem_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        promo_id: Uuid,
        now: PrimitiveDateTime,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE promos
            SET used_count = used_count + 1
            WHERE id = $1
              AND is_active
              AND start_at <= $2 AND end_at >= $2
              AND (usage_limit IS NULL OR used_count < usage_limit)
            "#,
        )
        .bind(promo_id)
        .bind(now)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[derive(Debug, Clone)]
/// Look up a promo by its code, case-insensitively.
pub struct GetPromoByCode {
    pub code: String,
}

impl Processor<GetPromoByCode> for DatabaseProcessor {
    type Output = Option<Promo>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPromoByCode")]
    async fn process(&self, query: GetPromoByCode) -> Result<Option<Promo>, sqlx::Error> {
        sqlx::query_as::<_, Promo>(
            r#"
            SELECT
                id, code, discount_type, value, max_discount, min_purchase,
                start_at, end_at, usage_limit, used_count, is_active
            FROM promos
            WHERE upper(code) = upper($1)
            "#,
        )
        .bind(query.code)
        .fetch_optional(&self.pool)
        .await
    }
}
