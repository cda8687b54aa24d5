//! Catalogue enums shared between the API and the database layer.

use serde::{Deserialize, Serialize};

use super::Target;

/// Product category. Decides which [`Target`] variant a product accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Game,
    Pulsa,
    Data,
    Ewallet,
    Streaming,
    SocialMedia,
    Voucher,
}

impl ProductCategory {
    /// Whether `target` is a valid destination for this category.
    pub fn accepts(&self, target: &Target) -> bool {
        matches!(
            (self, target),
            (ProductCategory::Game, Target::GameAccount { .. })
                | (
                    ProductCategory::Pulsa | ProductCategory::Data | ProductCategory::Ewallet,
                    Target::Phone { .. }
                )
                | (
                    ProductCategory::Streaming | ProductCategory::Voucher,
                    Target::Email { .. }
                )
                | (ProductCategory::SocialMedia, Target::Link { .. })
        )
    }

    /// The target kind this category expects, for error messages.
    pub fn expected_target(&self) -> &'static str {
        match self {
            ProductCategory::Game => "game_account",
            ProductCategory::Pulsa | ProductCategory::Data | ProductCategory::Ewallet => "phone",
            ProductCategory::Streaming | ProductCategory::Voucher => "email",
            ProductCategory::SocialMedia => "link",
        }
    }
}

/// Promo discount type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    Percent,
    Flat,
}
