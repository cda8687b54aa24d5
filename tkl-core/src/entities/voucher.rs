use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE", type_name = "voucher_status")]
pub enum VoucherStatus {
    Available,
    Used,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct VoucherStock {
    pub id: Uuid,
    pub denomination_id: Uuid,
    pub code: String,
    pub status: VoucherStatus,
    pub order_id: Option<Uuid>,
    pub used_at: Option<time::PrimitiveDateTime>,
}

impl VoucherStock {
    /// Claim one available voucher for `denomination_id` and bind it to the order.
    ///
    /// A voucher already bound to the order is returned again, so a retried
    /// claim never consumes a second code. Concurrent claimers skip each
    /// other's locked rows.
    pub async fn claim_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        denomination_id: Uuid,
        order_id: Uuid,
    ) -> Result<Option<VoucherStock>, sqlx::Error> {
        let existing = sqlx::query_as::<_, VoucherStock>(
            r#"
            SELECT id, denomination_id, code, status, order_id, used_at
            FROM voucher_stock
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&mut **tx)
        .await?;
        if existing.is_some() {
            return Ok(existing);
        }

        sqlx::query_as::<_, VoucherStock>(
            r#"
            UPDATE voucher_stock
            SET status = 'USED', order_id = $2, used_at = NOW()
            WHERE id = (
                SELECT id FROM voucher_stock
                WHERE denomination_id = $1 AND status = 'AVAILABLE'
                ORDER BY created_at
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, denomination_id, code, status, order_id, used_at
            "#,
        )
        .bind(denomination_id)
        .bind(order_id)
        .fetch_optional(&mut **tx)
        .await
    }
}
