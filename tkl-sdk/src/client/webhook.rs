//! Helper for producing signed mock-gateway webhooks.
//!
//! Useful for local end-to-end runs against a server configured with the
//! mock payment gateway: sign the payload with the same secret and post it
//! to `/webhooks/payment`.

use crate::objects::MockPaymentWebhook;
use crate::signature::{SignatureError, SignedObject};

/// Sign a mock-gateway webhook body.
///
/// Returns `(X-Signature header value, JSON body)`.
pub fn signed_mock_webhook(
    payload: MockPaymentWebhook,
    secret: &[u8],
) -> Result<(String, String), SignatureError> {
    let signed = SignedObject::new(payload, secret)?;
    Ok((signed.to_header(), signed.json))
}
