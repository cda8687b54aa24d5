//! Mapping of domain errors onto HTTP responses.
//!
//! Every failure leaves as an [`ErrorBody`]. Server-side failures are logged
//! here and answered with a generic message; only an order code, when the
//! order already exists, is passed back so the customer can resume it.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tkl_core::orchestrator::{OrderError, WebhookError};
use tkl_sdk::objects::ErrorBody;

const INTERNAL_ERROR: &str = "Internal server error";

/// Errors that can occur in storefront API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The request body or query string could not be decoded.
    BadRequest(String),
    Order(OrderError),
    Webhook(WebhookError),
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Order(err)
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        ApiError::Webhook(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

fn body(error: impl Into<String>) -> ErrorBody {
    ErrorBody {
        error: error.into(),
        field: None,
        order_code: None,
    }
}

fn order_error_response(err: OrderError) -> (StatusCode, ErrorBody) {
    match err {
        OrderError::Validation { field, message } => (
            StatusCode::BAD_REQUEST,
            ErrorBody {
                field: Some(field.to_string()),
                ..body(message)
            },
        ),
        OrderError::Promo(rejection) => (
            StatusCode::BAD_REQUEST,
            ErrorBody {
                field: Some("promoCode".into()),
                ..body(rejection.to_string())
            },
        ),
        err @ OrderError::NotFound(_) => (StatusCode::NOT_FOUND, body(err.to_string())),
        OrderError::InvoiceFailed { order_code, source } => {
            tracing::error!(order_code = %order_code, error = %source, "Invoice creation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    order_code: Some(order_code),
                    ..body("Payment could not be started, please resume the order later")
                },
            )
        }
        OrderError::Store(e) => {
            tracing::error!(error = %e, "Storefront API store error");
            (StatusCode::INTERNAL_SERVER_ERROR, body(INTERNAL_ERROR))
        }
    }
}

fn webhook_error_response(err: WebhookError) -> (StatusCode, ErrorBody) {
    match err {
        WebhookError::InvalidSignature => (StatusCode::UNAUTHORIZED, body("invalid signature")),
        WebhookError::Malformed(message) => (StatusCode::BAD_REQUEST, body(message)),
        WebhookError::OrderNotFound => (StatusCode::NOT_FOUND, body("order not found")),
        WebhookError::Store(e) => {
            tracing::error!(error = %e, "Webhook store error");
            (StatusCode::INTERNAL_SERVER_ERROR, body(INTERNAL_ERROR))
        }
    }
}

impl ApiError {
    fn into_parts(self) -> (StatusCode, ErrorBody) {
        match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, body(message)),
            ApiError::Order(err) => order_error_response(err),
            ApiError::Webhook(err) => webhook_error_response(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.into_parts();
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tkl_core::gateways::GatewayError;
    use tkl_core::pricing::PromoRejection;

    fn status_and_body(err: ApiError) -> (StatusCode, ErrorBody) {
        err.into_parts()
    }

    #[test]
    fn test_validation_carries_field() {
        let (status, body) = status_and_body(OrderError::validation("contactEmail", "bad").into());
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.field.as_deref(), Some("contactEmail"));
        assert_eq!(body.error, "bad");
    }

    #[test]
    fn test_promo_rejection_is_bad_request() {
        let (status, body) = status_and_body(OrderError::Promo(PromoRejection::Expired).into());
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.field.as_deref(), Some("promoCode"));
        assert_eq!(body.error, "Promo code has expired");
    }

    #[test]
    fn test_not_found() {
        let (status, body) = status_and_body(OrderError::NotFound("Product").into());
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Product not found");
    }

    #[test]
    fn test_invoice_failure_exposes_only_order_code() {
        let err = OrderError::InvoiceFailed {
            order_code: "TKL2ABC123".into(),
            source: GatewayError::Transient("connection refused to 10.0.0.3".into()),
        };
        let (status, body) = status_and_body(err.into());
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.order_code.as_deref(), Some("TKL2ABC123"));
        assert!(!body.error.contains("10.0.0.3"));
    }

    #[test]
    fn test_webhook_statuses() {
        assert_eq!(
            status_and_body(WebhookError::InvalidSignature.into()).0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_and_body(WebhookError::Malformed("x".into()).into()).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_and_body(WebhookError::OrderNotFound.into()).0,
            StatusCode::NOT_FOUND
        );
    }
}
