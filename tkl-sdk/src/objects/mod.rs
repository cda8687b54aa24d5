pub mod catalog;
pub mod order;
pub mod target;
pub mod webhook;

pub use catalog::{DiscountType, ProductCategory};
pub use order::{
    CheckoutResponse, CreateOrderRequest, ErrorBody, LookupQuery, OrderStatus, OrderView,
    PriceBreakdown, QuoteRequest, ResumeCheckoutRequest, VerifyTargetRequest,
    VerifyTargetResponse,
};
pub use target::Target;
pub use webhook::{MockPaymentWebhook, ResellerCallback, WebhookAck, WebhookOutcome};
