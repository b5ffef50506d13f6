//! Store record models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storeloom_core::{AccountId, Price, StoreId};
use url::Url;
use uuid::Uuid;

/// A product variant option such as "Size" with values `["S", "M", "L"]`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VariantOption {
    /// Option name.
    pub name: String,
    /// Option values, in display order.
    #[serde(default)]
    pub values: Vec<String>,
}

impl VariantOption {
    /// Create an option with no values.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    /// Append a value. Blank and duplicate values are ignored.
    ///
    /// Returns whether the value was added.
    pub fn add_value(&mut self, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() || self.values.iter().any(|v| v == value) {
            return false;
        }
        self.values.push(value.to_owned());
        true
    }

    /// Remove a value, keeping the order of the rest.
    ///
    /// Returns whether the value was present.
    pub fn remove_value(&mut self, value: &str) -> bool {
        let Some(index) = self.values.iter().position(|v| v == value) else {
            return false;
        };
        self.values.remove(index);
        true
    }
}

/// A product as stored on a generated store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreProduct {
    pub id: Uuid,
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<Url>,
    #[serde(default)]
    pub options: Vec<VariantOption>,
}

/// A collection as stored on a generated store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCollection {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub image: Option<Url>,
    /// Products in the collection, by product ID.
    #[serde(default)]
    pub product_ids: Vec<Uuid>,
}

/// Visual theme of a generated store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreTheme {
    /// Free-text style prompt from the wizard.
    #[serde(default)]
    pub style_prompt: String,
    /// Generated landing page.
    pub landing_page_html: Option<String>,
}

/// A store ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStore {
    pub owner: AccountId,
    pub name: String,
    pub logo_url: Option<Url>,
    pub products: Vec<StoreProduct>,
    pub collections: Vec<StoreCollection>,
    pub theme: StoreTheme,
}

/// A persisted store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub id: StoreId,
    pub owner: AccountId,
    pub name: String,
    pub logo_url: Option<Url>,
    pub products: Vec<StoreProduct>,
    pub collections: Vec<StoreCollection>,
    pub theme: StoreTheme,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_values_add_then_remove_round_trips() {
        let mut option = VariantOption {
            name: "Size".to_string(),
            values: vec!["S".to_string(), "M".to_string()],
        };
        let original = option.clone();

        assert!(option.add_value("XL"));
        assert_eq!(option.values, vec!["S", "M", "XL"]);
        assert!(option.remove_value("XL"));

        assert_eq!(option, original);
    }

    #[test]
    fn test_variant_values_ignore_blank_and_duplicates() {
        let mut option = VariantOption::new("Color");
        assert!(option.add_value(" Red "));
        assert!(!option.add_value("Red"));
        assert!(!option.add_value("   "));
        assert_eq!(option.values, vec!["Red"]);
    }

    #[test]
    fn test_remove_missing_value() {
        let mut option = VariantOption::new("Color");
        assert!(!option.remove_value("Blue"));
    }
}
