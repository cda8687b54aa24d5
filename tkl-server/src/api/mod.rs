//! Storefront HTTP API.
//!
//! Called by the checkout frontend (orders, targets) and by the payment
//! gateway and topup provider (webhooks). Handlers only translate HTTP; every
//! state change goes through the orchestrator.

pub mod error;
pub mod extractors;
mod orders;
mod webhooks;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Build the storefront API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders/quote", post(orders::quote))
        .route("/orders", get(orders::lookup_order).post(orders::create_order))
        .route("/orders/resume", post(orders::resume_checkout))
        .route("/targets/verify", post(orders::verify_target))
        .route("/webhooks/payment", post(webhooks::payment_webhook))
        .route("/webhooks/provider", post(webhooks::provider_callback))
}
