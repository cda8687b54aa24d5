//! Checkout and order lookup request/response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Target;

/// Order status for API responses.
///
/// This is the API/DTO version without sqlx::Type.
/// For database operations, use the version in `tkl-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    WaitingPayment,
    Paid,
    Processing,
    Success,
    Failed,
    Expired,
    Refunded,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::WaitingPayment => "WAITING_PAYMENT",
            OrderStatus::Paid => "PAID",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Success => "SUCCESS",
            OrderStatus::Failed => "FAILED",
            OrderStatus::Expired => "EXPIRED",
            OrderStatus::Refunded => "REFUNDED",
        };
        f.write_str(s)
    }
}

/// Checkout form submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub product_id: Uuid,
    pub denomination_id: Uuid,
    pub target: Target,
    pub contact_email: String,
    pub contact_whatsapp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
    pub payment_method: String,
}

/// Price preview request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub product_id: Uuid,
    pub denomination_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
}

/// Final charge breakdown. All amounts are in the smallest currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub base_price: i64,
    pub fee_flat: i64,
    pub fee_pct: i64,
    pub promo_discount: i64,
    pub total: i64,
}

/// Customer-facing view of an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: Uuid,
    pub code: String,
    pub status: OrderStatus,
    pub product_id: Uuid,
    pub denomination_id: Uuid,
    pub target: Target,
    pub contact_email: String,
    pub contact_whatsapp: String,
    pub payment_method: String,
    pub gateway: String,
    pub price: PriceBreakdown,
    pub provider_status: Option<String>,
    pub voucher_code: Option<String>,
    pub error_message: Option<String>,
    /// Unix timestamps.
    pub created_at: i64,
    pub paid_at: Option<i64>,
    pub success_at: Option<i64>,
    pub updated_at: i64,
}

/// Response to a successful checkout (or a replay of one).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub order: OrderView,
    pub payment_url: Option<String>,
    pub qr_code: Option<String>,
    #[serde(default)]
    pub payment_instructions: Vec<String>,
    pub expires_at: Option<i64>,
}

/// Query string of `GET /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupQuery {
    pub code: String,
    pub email: String,
}

/// Body of `POST /orders/resume`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeCheckoutRequest {
    pub code: String,
    pub email: String,
}

/// Body of `POST /targets/verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTargetRequest {
    pub product_id: Uuid,
    pub target: Target,
}

/// Result of a pre-checkout target check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTargetResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// JSON error body returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_code: Option<String>,
}
