//! Custom Axum extractors.
//!
//! Provides:
//! - `AppJson<T>` / `AppQuery<T>`: `Json` and `Query` whose rejections are
//!   reported as JSON [`ErrorBody`](tkl_sdk::objects::ErrorBody)s.
//! - `RawWebhook`: headers plus the untouched body bytes, so webhook
//!   signatures are checked against exactly what the sender signed.

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::HeaderMap,
};

use crate::api::error::ApiError;

/// Upper bound on webhook bodies read into memory.
const MAX_WEBHOOK_BODY: usize = 1024 * 1024;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);

/// An inbound webhook before any parsing.
pub struct RawWebhook {
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawWebhook {
    /// Value of `name`, if present and valid visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl<S: Send + Sync> FromRequest<S> for RawWebhook {
    type Rejection = ApiError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();
        let body = axum::body::to_bytes(body, MAX_WEBHOOK_BODY)
            .await
            .map_err(|_| ApiError::BadRequest("failed to read request body".into()))?;
        Ok(RawWebhook {
            headers: parts.headers,
            body,
        })
    }
}
