pub mod catalog;
pub mod order;
pub mod promo;
pub mod transaction_log;
pub mod voucher;
pub mod webhook_event;

use tkl_sdk::objects::{
    DiscountType as SdkDiscountType, OrderStatus as SdkOrderStatus,
    ProductCategory as SdkProductCategory,
};

/// Order lifecycle status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `tkl_sdk::objects::OrderStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE", type_name = "order_status")]
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

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::WaitingPayment,
        OrderStatus::Paid,
        OrderStatus::Processing,
        OrderStatus::Success,
        OrderStatus::Failed,
        OrderStatus::Expired,
        OrderStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::WaitingPayment => "WAITING_PAYMENT",
            OrderStatus::Paid => "PAID",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Success => "SUCCESS",
            OrderStatus::Failed => "FAILED",
            OrderStatus::Expired => "EXPIRED",
            OrderStatus::Refunded => "REFUNDED",
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Success | OrderStatus::Failed | OrderStatus::Expired | OrderStatus::Refunded
        )
    }

    /// Statuses from which `self` may be entered.
    ///
    /// `Refunded` is set by operators only and has no automatic source.
    pub fn sources(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[],
            OrderStatus::WaitingPayment => &[OrderStatus::Pending],
            OrderStatus::Paid => &[OrderStatus::Pending, OrderStatus::WaitingPayment],
            OrderStatus::Processing => &[OrderStatus::Paid, OrderStatus::WaitingPayment],
            OrderStatus::Success => &[OrderStatus::Processing],
            OrderStatus::Failed => &[
                OrderStatus::Pending,
                OrderStatus::WaitingPayment,
                OrderStatus::Paid,
                OrderStatus::Processing,
            ],
            OrderStatus::Expired => &[OrderStatus::Pending, OrderStatus::WaitingPayment],
            OrderStatus::Refunded => &[],
        }
    }

    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        to.sources().contains(self)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<OrderStatus> for SdkOrderStatus {
    fn from(value: OrderStatus) -> Self {
        match value {
            OrderStatus::Pending => SdkOrderStatus::Pending,
            OrderStatus::WaitingPayment => SdkOrderStatus::WaitingPayment,
            OrderStatus::Paid => SdkOrderStatus::Paid,
            OrderStatus::Processing => SdkOrderStatus::Processing,
            OrderStatus::Success => SdkOrderStatus::Success,
            OrderStatus::Failed => SdkOrderStatus::Failed,
            OrderStatus::Expired => SdkOrderStatus::Expired,
            OrderStatus::Refunded => SdkOrderStatus::Refunded,
        }
    }
}

impl From<SdkOrderStatus> for OrderStatus {
    fn from(value: SdkOrderStatus) -> Self {
        match value {
            SdkOrderStatus::Pending => OrderStatus::Pending,
            SdkOrderStatus::WaitingPayment => OrderStatus::WaitingPayment,
            SdkOrderStatus::Paid => OrderStatus::Paid,
            SdkOrderStatus::Processing => OrderStatus::Processing,
            SdkOrderStatus::Success => OrderStatus::Success,
            SdkOrderStatus::Failed => OrderStatus::Failed,
            SdkOrderStatus::Expired => OrderStatus::Expired,
            SdkOrderStatus::Refunded => OrderStatus::Refunded,
        }
    }
}

/// Product category for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `tkl_sdk::objects::ProductCategory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "product_category")]
pub enum ProductCategory {
    Game,
    Pulsa,
    Data,
    Ewallet,
    Streaming,
    SocialMedia,
    Voucher,
}

impl From<ProductCategory> for SdkProductCategory {
    fn from(value: ProductCategory) -> Self {
        match value {
            ProductCategory::Game => SdkProductCategory::Game,
            ProductCategory::Pulsa => SdkProductCategory::Pulsa,
            ProductCategory::Data => SdkProductCategory::Data,
            ProductCategory::Ewallet => SdkProductCategory::Ewallet,
            ProductCategory::Streaming => SdkProductCategory::Streaming,
            ProductCategory::SocialMedia => SdkProductCategory::SocialMedia,
            ProductCategory::Voucher => SdkProductCategory::Voucher,
        }
    }
}

impl From<SdkProductCategory> for ProductCategory {
    fn from(value: SdkProductCategory) -> Self {
        match value {
            SdkProductCategory::Game => ProductCategory::Game,
            SdkProductCategory::Pulsa => ProductCategory::Pulsa,
            SdkProductCategory::Data => ProductCategory::Data,
            SdkProductCategory::Ewallet => ProductCategory::Ewallet,
            SdkProductCategory::Streaming => ProductCategory::Streaming,
            SdkProductCategory::SocialMedia => ProductCategory::SocialMedia,
            SdkProductCategory::Voucher => ProductCategory::Voucher,
        }
    }
}

/// Promo discount type for database operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE", type_name = "discount_type")]
pub enum DiscountType {
    Percent,
    Flat,
}

impl From<DiscountType> for SdkDiscountType {
    fn from(value: DiscountType) -> Self {
        match value {
            DiscountType::Percent => SdkDiscountType::Percent,
            DiscountType::Flat => SdkDiscountType::Flat,
        }
    }
}

impl From<SdkDiscountType> for DiscountType {
    fn from(value: SdkDiscountType) -> Self {
        match value {
            SdkDiscountType::Percent => DiscountType::Percent,
            SdkDiscountType::Flat => DiscountType::Flat,
        }
    }
}
