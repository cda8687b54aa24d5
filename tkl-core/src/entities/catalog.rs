use kanau::processor::Processor;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::entities::ProductCategory;
use crate::framework::DatabaseProcessor;

/// How a product is delivered after payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "delivery_kind")]
pub enum DeliveryKind {
    /// Ordered from the topup provider.
    Provider,
    /// Served from pre-loaded voucher codes.
    VoucherStock,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub category: ProductCategory,
    pub delivery: DeliveryKind,
    /// Provider brand code, used for target verification.
    pub provider_code: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Denomination {
    pub id: Uuid,
    pub product_id: Uuid,
    pub label: String,
    /// Currency, item count or duration depending on the product.
    pub amount: i64,
    pub sell_price: i64,
    pub cost_price: i64,
    pub fee_flat: i64,
    /// Fraction of the sell price, e.g. `0.007` for 0.7%.
    pub fee_pct: Decimal,
    pub sort_order: i32,
    pub is_popular: bool,
    pub provider_code: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct GetProductById {
    pub product_id: Uuid,
}

impl Processor<GetProductById> for DatabaseProcessor {
    type Output = Option<Product>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetProductById")]
    async fn process(&self, query: GetProductById) -> Result<Option<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT id, slug, name, category, delivery, provider_code, is_active
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(query.product_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct GetDenominationById {
    pub denomination_id: Uuid,
}

impl Processor<GetDenominationById> for DatabaseProcessor {
    type Output = Option<Denomination>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetDenominationById")]
    async fn process(
        &self,
        query: GetDenominationById,
    ) -> Result<Option<Denomination>, sqlx::Error> {
        sqlx::query_as::<_, Denomination>(
            r#"
            SELECT
                id, product_id, label, amount, sell_price, cost_price,
                fee_flat, fee_pct, sort_order, is_popular, provider_code, is_active
            FROM denominations
            WHERE id = $1
            "#,
        )
        .bind(query.denomination_id)
        .fetch_optional(&self.pool)
        .await
    }
}
