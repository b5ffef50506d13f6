//! Credit amounts and the price list for AI-assisted actions.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Balance every account starts with the first time it is read.
pub const DEFAULT_CREDITS: Credits = Credits::new(100);

/// Errors produced by credit arithmetic.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CreditsError {
    /// An amount that must be positive was zero or negative.
    #[error("credit amount must be positive (got {0})")]
    NotPositive(i64),
}

/// A number of credits.
///
/// Balances are never negative once persisted; the type itself is signed so
/// that deltas and legacy records can be represented without panicking.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Credits(i64);

impl Credits {
    /// Zero credits.
    pub const ZERO: Self = Self(0);

    /// Create a credit amount.
    #[must_use]
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Create a strictly positive amount (used for debits and grants).
    ///
    /// # Errors
    ///
    /// Returns [`CreditsError::NotPositive`] for zero or negative input.
    pub const fn positive(amount: i64) -> Result<Self, CreditsError> {
        if amount <= 0 {
            return Err(CreditsError::NotPositive(amount));
        }
        Ok(Self(amount))
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Whether this balance covers `cost`.
    #[must_use]
    pub const fn covers(self, cost: Self) -> bool {
        self.0 >= cost.0
    }

    /// Subtract `cost`, returning `None` if the result would be negative.
    #[must_use]
    pub const fn checked_debit(self, cost: Self) -> Option<Self> {
        if self.0 < cost.0 {
            return None;
        }
        Some(Self(self.0 - cost.0))
    }

    /// Add `amount`, saturating at `i64::MAX`.
    #[must_use]
    pub const fn saturating_add(self, amount: Self) -> Self {
        Self(self.0.saturating_add(amount.0))
    }
}

impl fmt::Display for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Credits {
    fn from(amount: i64) -> Self {
        Self(amount)
    }
}

/// An action that costs credits.
///
/// Each variant has a fixed cost; the credit gate charges it only after the
/// action succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricedAction {
    /// Full store generation from a submitted wizard.
    StoreGeneration,
    /// Suggest a store name.
    StoreName,
    /// Generate a set of logo variants.
    Logo,
    /// Generate a batch of products.
    Products,
    /// Generate a batch of collections.
    Collections,
    /// Generate one product image.
    ProductImage,
    /// Edit an existing image with a prompt.
    ImageEdit,
    /// Generate an HTML page.
    Page,
    /// Turn an image into a short video clip.
    Video,
}

impl PricedAction {
    /// Fixed cost of the action.
    #[must_use]
    pub const fn cost(self) -> Credits {
        Credits::new(match self {
            Self::StoreGeneration => 25,
            Self::StoreName => 1,
            Self::Logo | Self::Collections => 5,
            Self::Products | Self::Page => 10,
            Self::ProductImage | Self::ImageEdit => 3,
            Self::Video => 20,
        })
    }

    /// Human-readable label used in notices and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::StoreGeneration => "store generation",
            Self::StoreName => "store name suggestion",
            Self::Logo => "logo generation",
            Self::Products => "product generation",
            Self::Collections => "collection generation",
            Self::ProductImage => "product image",
            Self::ImageEdit => "image edit",
            Self::Page => "page generation",
            Self::Video => "video generation",
        }
    }
}

impl fmt::Display for PricedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_credits() {
        assert_eq!(DEFAULT_CREDITS.get(), 100);
    }

    #[test]
    fn test_positive_rejects_zero_and_negative() {
        assert_eq!(Credits::positive(0), Err(CreditsError::NotPositive(0)));
        assert_eq!(Credits::positive(-5), Err(CreditsError::NotPositive(-5)));
        assert_eq!(Credits::positive(7), Ok(Credits::new(7)));
    }

    #[test]
    fn test_checked_debit() {
        let balance = Credits::new(30);
        assert_eq!(
            balance.checked_debit(PricedAction::StoreGeneration.cost()),
            Some(Credits::new(5))
        );
        assert_eq!(
            Credits::new(5).checked_debit(PricedAction::StoreGeneration.cost()),
            None
        );
        assert_eq!(balance.checked_debit(balance), Some(Credits::ZERO));
    }

    #[test]
    fn test_covers() {
        assert!(Credits::new(25).covers(PricedAction::StoreGeneration.cost()));
        assert!(!Credits::new(24).covers(PricedAction::StoreGeneration.cost()));
    }

    #[test]
    fn test_price_list() {
        assert_eq!(PricedAction::StoreGeneration.cost().get(), 25);
        assert_eq!(PricedAction::StoreName.cost().get(), 1);
        assert_eq!(PricedAction::Video.cost().get(), 20);
    }

    #[test]
    fn test_priced_action_serde() {
        let json = serde_json::to_string(&PricedAction::ProductImage).expect("serialize");
        assert_eq!(json, "\"product_image\"");
    }
}
