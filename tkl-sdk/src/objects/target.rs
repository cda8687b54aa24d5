//! Fulfillment target: where the purchased good is delivered.

use serde::{Deserialize, Serialize};

/// Destination identifier for fulfillment.
///
/// Which variant a product accepts depends on its category; see
/// [`ProductCategory::accepts`](super::ProductCategory::accepts).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Target {
    /// Mobile number for pulsa, data packages and e-wallets.
    Phone { number: String },
    /// In-game account, optionally scoped to a server/zone.
    GameAccount {
        uid: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        zone_id: Option<String>,
    },
    /// Account email for streaming subscriptions and vouchers.
    Email { email: String },
    /// Public profile or post URL for social-media boosting.
    Link { url: String },
}

impl Target {
    /// Short kind name used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Target::Phone { .. } => "phone",
            Target::GameAccount { .. } => "game_account",
            Target::Email { .. } => "email",
            Target::Link { .. } => "link",
        }
    }

    /// The primary identifier sent to providers as the customer number.
    pub fn primary(&self) -> &str {
        match self {
            Target::Phone { number } => number,
            Target::GameAccount { uid, .. } => uid,
            Target::Email { email } => email,
            Target::Link { url } => url,
        }
    }

    /// Secondary identifier (game zone / server id), if any.
    pub fn zone(&self) -> Option<&str> {
        match self {
            Target::GameAccount { zone_id, .. } => zone_id.as_deref(),
            _ => None,
        }
    }

    /// Stable textual form used when deriving idempotency keys.
    pub fn canonical(&self) -> String {
        match self.zone() {
            Some(zone) => format!("{}:{}({})", self.kind(), self.primary(), zone),
            None => format!("{}:{}", self.kind(), self.primary()),
        }
    }
}
