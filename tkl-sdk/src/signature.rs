//! Signature algorithms shared by the storefront and its webhook peers.
//!
//! Three schemes are in use:
//!
//! * **Timestamped body signing** (mock gateway webhooks):
//!
//!   ```text
//!   X-Signature: {unix_timestamp}.{base64_signature}
//!   ```
//!
//!   where the signature is `HMAC-SHA256("{timestamp}.{raw_body}", secret)`.
//!
//! * **Hex body signing** (Tripay and reseller callbacks):
//!   `hex(HMAC-SHA256(raw_body, secret))`.
//!
//! * **Static callback tokens** (Xendit): the presented token is compared to
//!   the configured one through HMAC, never with `==`.
//!
//! Every comparison goes through [`ring::hmac::verify`], which is constant
//! time. An empty secret or an empty signature never verifies.

use ring::hmac;

/// Header name for the timestamped HMAC signature.
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Header carrying the caller-chosen idempotency key on checkout.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Maximum allowed age of a timestamped signature (in seconds).
pub const MAX_SIGNATURE_AGE: i64 = 5 * 60;

/// Marker trait for types that can participate in body signing via
/// [`SignedObject`].
pub trait Signature: for<'de> serde::Deserialize<'de> + serde::Serialize {}

/// Errors produced by signature operations.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid header format")]
    InvalidFormat,
    #[error("invalid signature encoding")]
    InvalidEncoding,
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid signature")]
    SignatureMismatch,
    #[error("signature expired")]
    Expired,
    #[error("no secret configured")]
    MissingSecret,
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

fn key(secret: &[u8]) -> Result<hmac::Key, SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::MissingSecret);
    }
    Ok(hmac::Key::new(hmac::HMAC_SHA256, secret))
}

// ---------------------------------------------------------------------------
// SignedObject: timestamped body signing
// ---------------------------------------------------------------------------

/// A signed body carrying its typed payload, timestamp, raw JSON, and
/// HMAC-SHA256 signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedObject<T: Signature> {
    pub body: T,
    pub timestamp: i64,
    pub json: String,
    pub signature: Box<[u8]>,
}

impl<T: Signature> SignedObject<T> {
    /// Serialize `body` and sign it with the current timestamp.
    pub fn new(body: T, secret: &[u8]) -> Result<Self, SignatureError> {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        Self::new_at(body, secret, now)
    }

    /// Serialize `body` and sign it with an explicit timestamp.
    pub fn new_at(body: T, secret: &[u8], timestamp: i64) -> Result<Self, SignatureError> {
        let json = serde_json::to_string(&body)?;
        let signature = sign_timestamped(&json, timestamp, secret)?;
        Ok(Self {
            body,
            timestamp,
            json,
            signature,
        })
    }

    /// Reconstruct a [`SignedObject`] from a raw `X-Signature` header value
    /// and the JSON request body string.
    ///
    /// This parses the header and deserializes the body but does **not**
    /// verify the HMAC; call [`verify`](Self::verify) for that.
    pub fn from_header_and_body(
        header_value: &str,
        body_json: String,
    ) -> Result<Self, SignatureError> {
        let (timestamp, signature) = parse_signature_header(header_value)?;
        let body: T = serde_json::from_str(&body_json)?;
        Ok(Self {
            body,
            timestamp,
            json: body_json,
            signature,
        })
    }

    /// Verify the HMAC signature and timestamp freshness, consuming `self`
    /// and returning the authenticated payload.
    pub fn verify(self, secret: &[u8]) -> Result<T, SignatureError> {
        verify_timestamped(&self.json, self.timestamp, &self.signature, secret)?;
        Ok(self.body)
    }

    /// Format the full `X-Signature` header value (`{timestamp}.{b64}`).
    pub fn to_header(&self) -> String {
        format_signature_header(self.timestamp, &self.signature)
    }
}

/// Compute `HMAC-SHA256("{timestamp}.{body}", secret)`.
pub fn sign_timestamped(
    body: &str,
    timestamp: i64,
    secret: &[u8],
) -> Result<Box<[u8]>, SignatureError> {
    let data = format!("{timestamp}.{body}");
    let tag = hmac::sign(&key(secret)?, data.as_bytes());
    Ok(tag.as_ref().to_owned().into_boxed_slice())
}

/// Verify a timestamped body signature and its freshness.
pub fn verify_timestamped(
    body: &str,
    timestamp: i64,
    signature: &[u8],
    secret: &[u8],
) -> Result<(), SignatureError> {
    if signature.is_empty() {
        return Err(SignatureError::SignatureMismatch);
    }
    let data = format!("{timestamp}.{body}");
    hmac::verify(&key(secret)?, data.as_bytes(), signature)?;
    check_timestamp(timestamp)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Header parsing / formatting
// ---------------------------------------------------------------------------

/// Parse an `X-Signature` header value (`{timestamp}.{base64}`) into
/// `(timestamp, raw_signature_bytes)`.
pub fn parse_signature_header(value: &str) -> Result<(i64, Box<[u8]>), SignatureError> {
    let (timestamp, encoded) = value
        .trim()
        .split_once('.')
        .ok_or(SignatureError::InvalidFormat)?;
    let timestamp: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::InvalidFormat)?;
    let signature_bytes = fast32::base64::RFC4648_NOPAD
        .decode_str(encoded)
        .map_err(|_| SignatureError::InvalidEncoding)?
        .into_boxed_slice();
    Ok((timestamp, signature_bytes))
}

/// Format a `{timestamp}.{base64}` header value from its parts.
pub fn format_signature_header(timestamp: i64, signature: &[u8]) -> String {
    format!(
        "{}.{}",
        timestamp,
        fast32::base64::RFC4648_NOPAD.encode(signature)
    )
}

/// Check that a signature timestamp is within [`MAX_SIGNATURE_AGE`] of now,
/// in either direction.
pub fn check_timestamp(timestamp: i64) -> Result<(), SignatureError> {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    if (now - timestamp).abs() > MAX_SIGNATURE_AGE {
        return Err(SignatureError::Expired);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Hex body signing
// ---------------------------------------------------------------------------

/// `hex(HMAC-SHA256(data, secret))`, lowercase.
pub fn hmac_sha256_hex(data: &[u8], secret: &[u8]) -> Result<String, SignatureError> {
    let tag = hmac::sign(&key(secret)?, data);
    Ok(hex::encode(tag.as_ref()))
}

/// Verify a hex-encoded HMAC-SHA256 over `data`. Case-insensitive on the hex.
pub fn verify_hex(data: &[u8], signature_hex: &str, secret: &[u8]) -> Result<(), SignatureError> {
    let signature_hex = signature_hex.trim();
    if signature_hex.is_empty() {
        return Err(SignatureError::SignatureMismatch);
    }
    let signature = hex::decode(signature_hex).map_err(|_| SignatureError::InvalidEncoding)?;
    hmac::verify(&key(secret)?, data, &signature)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Static tokens
// ---------------------------------------------------------------------------

/// Compare a presented callback token with the expected one in constant time.
///
/// The expected token is MACed under itself and the presented token is
/// verified against that tag, so the comparison never short-circuits on the
/// first differing byte.
pub fn verify_token(presented: &str, expected: &str) -> Result<(), SignatureError> {
    if presented.is_empty() {
        return Err(SignatureError::SignatureMismatch);
    }
    let key = key(expected.as_bytes())?;
    let tag = hmac::sign(&key, expected.as_bytes());
    hmac::verify(&key, presented.as_bytes(), tag.as_ref())?;
    Ok(())
}
