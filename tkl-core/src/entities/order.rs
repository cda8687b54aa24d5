use kanau::processor::Processor;
use sqlx::types::Json;
use time::PrimitiveDateTime;
use tkl_sdk::objects::{OrderView, PriceBreakdown, Target};
use uuid::Uuid;

use crate::entities::OrderStatus;
use crate::framework::DatabaseProcessor;
use crate::utils::clock::to_unix;

const ORDER_COLUMNS: &str = r#"
    id, code, product_id, denomination_id, target, contact_email, contact_whatsapp,
    payment_method, gateway, base_price, fee_flat, fee_pct, promo_id, promo_discount,
    total_amount, idempotency_key, status, payment_ref, checkout_url, payment_qr,
    payment_instructions, payment_expires_at, provider_order_id, provider_status,
    voucher_code, error_message, fulfillment_attempts, created_at, paid_at,
    success_at, updated_at
"#;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub code: String,
    pub product_id: Uuid,
    pub denomination_id: Uuid,
    pub target: Json<Target>,
    pub contact_email: String,
    pub contact_whatsapp: String,
    pub payment_method: String,
    pub gateway: String,
    pub base_price: i64,
    pub fee_flat: i64,
    pub fee_pct: i64,
    pub promo_id: Option<Uuid>,
    pub promo_discount: i64,
    pub total_amount: i64,
    pub idempotency_key: String,
    pub status: OrderStatus,
    /// Gateway invoice id.
    pub payment_ref: Option<String>,
    pub checkout_url: Option<String>,
    pub payment_qr: Option<String>,
    pub payment_instructions: Json<Vec<String>>,
    pub payment_expires_at: Option<PrimitiveDateTime>,
    pub provider_order_id: Option<String>,
    pub provider_status: Option<String>,
    pub voucher_code: Option<String>,
    pub error_message: Option<String>,
    pub fulfillment_attempts: i32,
    pub created_at: PrimitiveDateTime,
    pub paid_at: Option<PrimitiveDateTime>,
    pub success_at: Option<PrimitiveDateTime>,
    pub updated_at: PrimitiveDateTime,
}

impl Order {
    pub fn price(&self) -> PriceBreakdown {
        PriceBreakdown {
            base_price: self.base_price,
            fee_flat: self.fee_flat,
            fee_pct: self.fee_pct,
            promo_discount: self.promo_discount,
            total: self.total_amount,
        }
    }

    /// Whether the stored email matches, ignoring case and surrounding space.
    pub fn contact_matches(&self, email: &str) -> bool {
        self.contact_email
            .trim()
            .eq_ignore_ascii_case(email.trim())
    }

    pub fn to_view(&self) -> OrderView {
        OrderView {
            id: self.id,
            code: self.code.clone(),
            status: self.status.into(),
            product_id: self.product_id,
            denomination_id: self.denomination_id,
            target: self.target.0.clone(),
            contact_email: self.contact_email.clone(),
            contact_whatsapp: self.contact_whatsapp.clone(),
            payment_method: self.payment_method.clone(),
            gateway: self.gateway.clone(),
            price: self.price(),
            provider_status: self.provider_status.clone(),
            voucher_code: self.voucher_code.clone(),
            error_message: self.error_message.clone(),
            created_at: to_unix(self.created_at),
            paid_at: self.paid_at.map(to_unix),
            success_at: self.success_at.map(to_unix),
            updated_at: to_unix(self.updated_at),
        }
    }
}

/// Everything needed to persist a fresh PENDING order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderInsert {
    pub id: Uuid,
    pub code: String,
    pub product_id: Uuid,
    pub denomination_id: Uuid,
    pub target: Target,
    pub contact_email: String,
    pub contact_whatsapp: String,
    pub payment_method: String,
    pub gateway: String,
    pub price: PriceBreakdown,
    pub promo_id: Option<Uuid>,
    pub idempotency_key: String,
}

impl OrderInsert {
    /// The row as it looks right after insertion.
    pub fn into_order(self, now: PrimitiveDateTime) -> Order {
        Order {
            id: self.id,
            code: self.code,
            product_id: self.product_id,
            denomination_id: self.denomination_id,
            target: Json(self.target),
            contact_email: self.contact_email,
            contact_whatsapp: self.contact_whatsapp,
            payment_method: self.payment_method,
            gateway: self.gateway,
            base_price: self.price.base_price,
            fee_flat: self.price.fee_flat,
            fee_pct: self.price.fee_pct,
            promo_id: self.promo_id,
            promo_discount: self.price.promo_discount,
            total_amount: self.price.total,
            idempotency_key: self.idempotency_key,
            status: OrderStatus::Pending,
            payment_ref: None,
            checkout_url: None,
            payment_qr: None,
            payment_instructions: Json(Vec::new()),
            payment_expires_at: None,
            provider_order_id: None,
            provider_status: None,
            voucher_code: None,
            error_message: None,
            fulfillment_attempts: 0,
            created_at: now,
            paid_at: None,
            success_at: None,
            updated_at: now,
        }
    }
}

/// Column updates applied together with a status transition.
///
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderPatch {
    pub payment_ref: Option<String>,
    pub checkout_url: Option<String>,
    pub payment_qr: Option<String>,
    pub payment_instructions: Option<Vec<String>>,
    pub payment_expires_at: Option<PrimitiveDateTime>,
    pub provider_order_id: Option<String>,
    pub provider_status: Option<String>,
    pub voucher_code: Option<String>,
    pub error_message: Option<String>,
    pub paid_at: Option<PrimitiveDateTime>,
    pub success_at: Option<PrimitiveDateTime>,
    pub bump_attempts: bool,
    /// Only apply while `fulfillment_attempts` still equals this value.
    pub expected_attempts: Option<i32>,
}

impl OrderPatch {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Whether the attempts guard lets this patch through.
    pub fn allows(&self, order: &Order) -> bool {
        self.expected_attempts
            .is_none_or(|n| order.fulfillment_attempts == n)
    }

    /// Apply to an in-memory row, mirroring the SQL `COALESCE` update.
    pub fn apply(self, order: &mut Order, to: OrderStatus, now: PrimitiveDateTime) {
        order.status = to;
        if let Some(v) = self.payment_ref {
            order.payment_ref = Some(v);
        }
        if let Some(v) = self.checkout_url {
            order.checkout_url = Some(v);
        }
        if let Some(v) = self.payment_qr {
            order.payment_qr = Some(v);
        }
        if let Some(v) = self.payment_instructions {
            order.payment_instructions = Json(v);
        }
        if let Some(v) = self.payment_expires_at {
            order.payment_expires_at = Some(v);
        }
        if let Some(v) = self.provider_order_id {
            order.provider_order_id = Some(v);
        }
        if let Some(v) = self.provider_status {
            order.provider_status = Some(v);
        }
        if let Some(v) = self.voucher_code {
            order.voucher_code = Some(v);
        }
        if let Some(v) = self.error_message {
            order.error_message = Some(v);
        }
        if let Some(v) = self.paid_at {
            order.paid_at = Some(v);
        }
        if let Some(v) = self.success_at {
            order.success_at = Some(v);
        }
        if self.bump_attempts {
            order.fulfillment_attempts += 1;
        }
        order.updated_at = now;
    }
}

impl Order {
    /// Insert unless the idempotency key is already taken.
    ///
    /// Returns `None` on a key conflict; nothing is written in that case.
    pub async fn insert_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        insert: OrderInsert,
    ) -> Result<Option<Order>, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO orders (
                id, code, product_id, denomination_id, target, contact_email,
                contact_whatsapp, payment_method, gateway, base_price, fee_flat,
                fee_pct, promo_id, promo_discount, total_amount, idempotency_key, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, 'PENDING')
            ON CONFLICT (idempotency_key) DO NOTHING
            RETURNING {ORDER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Order>(&sql)
            .bind(insert.id)
            .bind(insert.code)
            .bind(insert.product_id)
            .bind(insert.denomination_id)
            .bind(Json(insert.target))
            .bind(insert.contact_email)
            .bind(insert.contact_whatsapp)
            .bind(insert.payment_method)
            .bind(insert.gateway)
            .bind(insert.price.base_price)
            .bind(insert.price.fee_flat)
            .bind(insert.price.fee_pct)
            .bind(insert.promo_id)
            .bind(insert.price.promo_discount)
            .bind(insert.price.total)
            .bind(insert.idempotency_key)
            .fetch_optional(&mut **tx)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct GetOrderById {
    pub order_id: Uuid,
}

impl Processor<GetOrderById> for DatabaseProcessor {
    type Output = Option<Order>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderById")]
    async fn process(&self, query: GetOrderById) -> Result<Option<Order>, sqlx::Error> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        sqlx::query_as::<_, Order>(&sql)
            .bind(query.order_id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct GetOrderByCode {
    pub code: String,
}

impl Processor<GetOrderByCode> for DatabaseProcessor {
    type Output = Option<Order>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderByCode")]
    async fn process(&self, query: GetOrderByCode) -> Result<Option<Order>, sqlx::Error> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE code = $1");
        sqlx::query_as::<_, Order>(&sql)
            .bind(query.code)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct GetOrderByIdempotencyKey {
    pub key: String,
}

impl Processor<GetOrderByIdempotencyKey> for DatabaseProcessor {
    type Output = Option<Order>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderByIdempotencyKey")]
    async fn process(
        &self,
        query: GetOrderByIdempotencyKey,
    ) -> Result<Option<Order>, sqlx::Error> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE idempotency_key = $1");
        sqlx::query_as::<_, Order>(&sql)
            .bind(query.key)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// Find the order a gateway invoice belongs to.
pub struct GetOrderByPaymentRef {
    pub gateway: String,
    pub payment_ref: String,
}

impl Processor<GetOrderByPaymentRef> for DatabaseProcessor {
    type Output = Option<Order>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderByPaymentRef")]
    async fn process(&self, query: GetOrderByPaymentRef) -> Result<Option<Order>, sqlx::Error> {
        let sql =
            format!("SELECT {ORDER_COLUMNS} FROM orders WHERE gateway = $1 AND payment_ref = $2");
        sqlx::query_as::<_, Order>(&sql)
            .bind(query.gateway)
            .bind(query.payment_ref)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct GetOrderByProviderOrderId {
    pub provider_order_id: String,
}

impl Processor<GetOrderByProviderOrderId> for DatabaseProcessor {
    type Output = Option<Order>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderByProviderOrderId")]
    async fn process(
        &self,
        query: GetOrderByProviderOrderId,
    ) -> Result<Option<Order>, sqlx::Error> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE provider_order_id = $1");
        sqlx::query_as::<_, Order>(&sql)
            .bind(query.provider_order_id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// Conditional status update: applies only while the order is in one of `from`.
///
/// Returns the updated row, or `None` if another writer moved the order first.
pub struct TransitionOrder {
    pub order_id: Uuid,
    pub from: Vec<OrderStatus>,
    pub to: OrderStatus,
    pub patch: OrderPatch,
    /// Written to `updated_at`; taken from the application clock so both
    /// stores and the stale-order cutoffs agree.
    pub at: PrimitiveDateTime,
}

impl Processor<TransitionOrder> for DatabaseProcessor {
    type Output = Option<Order>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:TransitionOrder")]
    async fn process(&self, cmd: TransitionOrder) -> Result<Option<Order>, sqlx::Error> {
        let from: Vec<String> = cmd.from.iter().map(|s| s.as_str().to_string()).collect();
        let patch = cmd.patch;
        let sql = format!(
            r#"
            UPDATE orders SET
                status = $2,
                payment_ref = COALESCE($4, payment_ref),
                checkout_url = COALESCE($5, checkout_url),
                payment_qr = COALESCE($6, payment_qr),
                payment_instructions = COALESCE($7, payment_instructions),
                payment_expires_at = COALESCE($8, payment_expires_at),
                provider_order_id = COALESCE($9, provider_order_id),
                provider_status = COALESCE($10, provider_status),
                voucher_code = COALESCE($11, voucher_code),
                error_message = COALESCE($12, error_message),
                paid_at = COALESCE($13, paid_at),
                success_at = COALESCE($14, success_at),
                fulfillment_attempts = fulfillment_attempts + $15,
                updated_at = $16
            WHERE id = $1 AND status::text = ANY($3)
                AND ($17::INT IS NULL OR fulfillment_attempts = $17)
            RETURNING {ORDER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Order>(&sql)
            .bind(cmd.order_id)
            .bind(cmd.to)
            .bind(from)
            .bind(patch.payment_ref)
            .bind(patch.checkout_url)
            .bind(patch.payment_qr)
            .bind(patch.payment_instructions.map(Json))
            .bind(patch.payment_expires_at)
            .bind(patch.provider_order_id)
            .bind(patch.provider_status)
            .bind(patch.voucher_code)
            .bind(patch.error_message)
            .bind(patch.paid_at)
            .bind(patch.success_at)
            .bind(i32::from(patch.bump_attempts))
            .bind(cmd.at)
            .bind(patch.expected_attempts)
            .fetch_optional(&self.pool)
            .await
    }
}

/// Age filter for [`GetOrdersInStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleCutoff {
    /// Last touched before the given time.
    UpdatedBefore(PrimitiveDateTime),
    /// Invoice expired before the given time.
    InvoiceExpiredBefore(PrimitiveDateTime),
}

impl StaleCutoff {
    pub fn matches(&self, order: &Order) -> bool {
        match self {
            StaleCutoff::UpdatedBefore(at) => order.updated_at < *at,
            StaleCutoff::InvoiceExpiredBefore(at) => {
                order.payment_expires_at.is_some_and(|exp| exp < *at)
            }
        }
    }
}

#[derive(Debug, Clone)]
/// Oldest-first batch of orders in `statuses` that pass `cutoff`.
pub struct GetOrdersInStatus {
    pub statuses: Vec<OrderStatus>,
    pub cutoff: StaleCutoff,
    pub limit: i64,
}

impl Processor<GetOrdersInStatus> for DatabaseProcessor {
    type Output = Vec<Order>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrdersInStatus")]
    async fn process(&self, query: GetOrdersInStatus) -> Result<Vec<Order>, sqlx::Error> {
        let statuses: Vec<String> = query
            .statuses
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        let (column, at) = match query.cutoff {
            StaleCutoff::UpdatedBefore(at) => ("updated_at", at),
            StaleCutoff::InvoiceExpiredBefore(at) => ("payment_expires_at", at),
        };
        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE status::text = ANY($1) AND {column} < $2
            ORDER BY {column} ASC
            LIMIT $3
            "#
        );
        sqlx::query_as::<_, Order>(&sql)
            .bind(statuses)
            .bind(at)
            .bind(query.limit)
            .fetch_all(&self.pool)
            .await
    }
}
