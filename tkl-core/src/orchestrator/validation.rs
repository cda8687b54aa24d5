//! Boundary checks on checkout input.

use tkl_sdk::objects::{ProductCategory, Target};

use super::OrderError;

const MAX_FIELD_LEN: usize = 254;

fn digits_only(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect()
}

/// `+62…`, `62…` or `08…` style numbers, 9 to 15 digits.
pub fn is_valid_phone(raw: &str) -> bool {
    let cleaned = digits_only(raw.trim());
    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    (9..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
}

pub fn is_valid_email(raw: &str) -> bool {
    let email = raw.trim();
    if email.len() > MAX_FIELD_LEN || email.contains(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn is_valid_account_id(raw: &str, max: usize) -> bool {
    let id = raw.trim();
    !id.is_empty() && id.len() <= max && id.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Check that `target` suits `category` and is well formed.
pub fn validate_target(category: ProductCategory, target: &Target) -> Result<(), OrderError> {
    if !category.accepts(target) {
        return Err(OrderError::validation(
            "target",
            format!(
                "This product needs a {} target, got {}",
                category.expected_target(),
                target.kind()
            ),
        ));
    }
    let ok = match target {
        Target::Phone { number } => is_valid_phone(number),
        Target::GameAccount { uid, zone_id } => {
            is_valid_account_id(uid, 32)
                && zone_id.as_deref().is_none_or(|z| is_valid_account_id(z, 16))
        }
        Target::Email { email } => is_valid_email(email),
        Target::Link { url } => url::Url::parse(url.trim())
            .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
            .unwrap_or(false),
    };
    if ok {
        Ok(())
    } else {
        Err(OrderError::validation(
            "target",
            format!("Invalid {} target", target.kind()),
        ))
    }
}

/// Contact and payment fields shared by every checkout.
pub fn validate_contact(
    contact_email: &str,
    contact_whatsapp: &str,
    payment_method: &str,
) -> Result<(), OrderError> {
    if !is_valid_email(contact_email) {
        return Err(OrderError::validation(
            "contactEmail",
            "A valid email address is required",
        ));
    }
    if !is_valid_phone(contact_whatsapp) {
        return Err(OrderError::validation(
            "contactWhatsapp",
            "A valid WhatsApp number is required",
        ));
    }
    let method = payment_method.trim();
    if method.is_empty()
        || method.len() > 32
        || !method
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    {
        return Err(OrderError::validation(
            "paymentMethod",
            "Unknown payment method",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phones() {
        assert!(is_valid_phone("081234567890"));
        assert!(is_valid_phone("+62 812-3456-7890"));
        assert!(!is_valid_phone("0812"));
        assert!(!is_valid_phone("08123456789a"));
    }

    #[test]
    fn emails() {
        assert!(is_valid_email("buyer@example.com"));
        assert!(!is_valid_email("buyer@example"));
        assert!(!is_valid_email("buyer example@x.com"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn targets_must_match_category() {
        let phone = Target::Phone {
            number: "081234567890".into(),
        };
        assert!(validate_target(ProductCategory::Pulsa, &phone).is_ok());
        let err = validate_target(ProductCategory::Game, &phone).unwrap_err();
        assert!(matches!(err, OrderError::Validation { field: "target", .. }));

        let game = Target::GameAccount {
            uid: "12345678".into(),
            zone_id: Some("20 01".into()),
        };
        assert!(validate_target(ProductCategory::Game, &game).is_err());

        let link = Target::Link {
            url: "ftp://example.com/x".into(),
        };
        assert!(validate_target(ProductCategory::SocialMedia, &link).is_err());
    }
}
