use ring::digest;
use tkl_sdk::objects::Target;
use uuid::Uuid;

/// Inputs that identify one checkout attempt.
#[derive(Debug, Clone, Copy)]
pub struct IdempotencyInput<'a> {
    pub product_id: Uuid,
    pub denomination_id: Uuid,
    pub target: &'a Target,
    pub contact_email: &'a str,
    pub contact_whatsapp: &'a str,
}

/// Derive the key for a checkout submitted at `unix_now`.
///
/// Submissions of the same payload inside one `bucket_seconds` window map to
/// the same key. Contact fields are compared case-insensitively.
pub fn derive_key(input: IdempotencyInput<'_>, unix_now: i64, bucket_seconds: u64) -> String {
    let bucket = unix_now.div_euclid(bucket_seconds.max(1) as i64);
    let material = format!(
        "{}|{}|{}|{}|{}|{}",
        input.product_id,
        input.denomination_id,
        input.target.canonical(),
        input.contact_email.trim().to_ascii_lowercase(),
        input.contact_whatsapp.trim(),
        bucket,
    );
    hex::encode(digest::digest(&digest::SHA256, material.as_bytes()))
}

/// Accept a client-provided key if it is printable and of sane length.
pub fn sanitize_client_key(raw: &str) -> Option<String> {
    let key = raw.trim();
    let valid = (8..=128).contains(&key.len())
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':'));
    valid.then(|| key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(target: &Target) -> IdempotencyInput<'_> {
        IdempotencyInput {
            product_id: Uuid::nil(),
            denomination_id: Uuid::nil(),
            target,
            contact_email: "Buyer@Example.com",
            contact_whatsapp: "6281200000000",
        }
    }

    #[test]
    fn same_bucket_same_key() {
        let target = Target::Phone {
            number: "081234567890".into(),
        };
        let a = derive_key(input(&target), 1_000, 600);
        let b = derive_key(input(&target), 1_100, 600);
        let c = derive_key(input(&target), 1_300, 600);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn different_target_different_key() {
        let a = Target::Phone {
            number: "081234567890".into(),
        };
        let b = Target::Phone {
            number: "081234567891".into(),
        };
        assert_ne!(
            derive_key(input(&a), 0, 600),
            derive_key(input(&b), 0, 600)
        );
    }

    #[test]
    fn client_keys_are_validated() {
        assert_eq!(
            sanitize_client_key(" checkout-123456 ").as_deref(),
            Some("checkout-123456")
        );
        assert!(sanitize_client_key("short").is_none());
        assert!(sanitize_client_key("has spaces inside").is_none());
    }
}
