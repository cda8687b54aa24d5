use fast32::base32::CROCKFORD;
use rand::Rng;

/// Number of base32 characters after the prefix.
pub const CODE_BODY_LEN: usize = 7;

const LOWER: u64 = 32u64.pow(CODE_BODY_LEN as u32 - 1);
const UPPER: u64 = 32u64.pow(CODE_BODY_LEN as u32);

/// Generate a customer-facing order code such as `TKL2ABC123`.
///
/// The body is drawn from `[32^6, 32^7)` so it always encodes to exactly
/// seven Crockford characters. Uniqueness is enforced by the store.
pub fn generate(prefix: &str) -> String {
    let value = rand::rng().random_range(LOWER..UPPER);
    format!("{prefix}{}", CROCKFORD.encode_u64(value))
}

/// Normalise a code typed by a customer: trim and uppercase.
pub fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
