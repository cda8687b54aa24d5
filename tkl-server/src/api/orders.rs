//! Checkout and order lookup handlers.
//!
//! # Endpoints
//!
//! - `POST /orders/quote`        – price preview, promo checked but not redeemed
//! - `POST /orders`              – place an order and open its invoice
//! - `GET  /orders?code=&email=` – look up an order by code and contact email
//! - `POST /orders/resume`       – reissue or fetch payment details
//! - `POST /targets/verify`      – check a fulfillment target before checkout

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
};
use tkl_core::orchestrator::{OrderError, checkout_response};
use tkl_sdk::objects::{
    CheckoutResponse, CreateOrderRequest, LookupQuery, OrderView, PriceBreakdown, QuoteRequest,
    ResumeCheckoutRequest, VerifyTargetRequest, VerifyTargetResponse,
};
use tkl_sdk::signature::IDEMPOTENCY_KEY_HEADER;

use crate::api::error::ApiError;
use crate::api::extractors::{AppJson, AppQuery};
use crate::state::AppState;

/// `POST /orders/quote`
pub(crate) async fn quote(
    State(state): State<AppState>,
    AppJson(request): AppJson<QuoteRequest>,
) -> Result<Json<PriceBreakdown>, ApiError> {
    let price = state.orchestrator.quote(&request).await?;
    Ok(Json(price))
}

/// `POST /orders`
///
/// Answers 201 for a new order and 200 when the idempotency key matched an
/// earlier checkout. The key in effect is echoed in `Idempotency-Key`.
pub(crate) async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(request): AppJson<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let client_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .map(|v| {
            v.to_str().map_err(|_| {
                OrderError::validation(
                    "idempotencyKey",
                    "Idempotency-Key must be visible ASCII",
                )
            })
        })
        .transpose()?;

    let result = state
        .orchestrator
        .create_order(&request, client_key)
        .await?;

    let status = if result.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let mut response_headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&result.order.idempotency_key) {
        response_headers.insert(IDEMPOTENCY_KEY_HEADER, value);
    }
    Ok((status, response_headers, Json(result.to_response())))
}

/// `GET /orders?code=&email=`
pub(crate) async fn lookup_order(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<LookupQuery>,
) -> Result<Json<OrderView>, ApiError> {
    let order = state
        .orchestrator
        .lookup_order(&query.code, &query.email)
        .await?;
    Ok(Json(order.to_view()))
}

/// `POST /orders/resume`
pub(crate) async fn resume_checkout(
    State(state): State<AppState>,
    AppJson(request): AppJson<ResumeCheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let order = state
        .orchestrator
        .resume_checkout(&request.code, &request.email)
        .await?;
    Ok(Json(checkout_response(&order)))
}

/// `POST /targets/verify`
pub(crate) async fn verify_target(
    State(state): State<AppState>,
    AppJson(request): AppJson<VerifyTargetRequest>,
) -> Result<Json<VerifyTargetResponse>, ApiError> {
    let response = state
        .orchestrator
        .verify_target(request.product_id, &request.target)
        .await?;
    Ok(Json(response))
}
