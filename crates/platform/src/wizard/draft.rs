//! Wizard form state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storeloom_core::ItemSource;
use url::Url;
use uuid::Uuid;

use crate::generation::prompts::{CollectionSuggestion, ProductSuggestion};
use crate::models::VariantOption;

/// How the store's concept is provided on the first step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ImportMethod {
    /// A product category such as "Fashion".
    ProductType { product_type: String },
    /// A free-text description of the store.
    Description { text: String },
    /// Start from nothing.
    Scratch,
}

impl Default for ImportMethod {
    fn default() -> Self {
        Self::ProductType {
            product_type: String::new(),
        }
    }
}

/// Logo variants produced so far and the one picked.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogoSection {
    #[serde(default)]
    pub variants: Vec<Url>,
    pub selected: Option<usize>,
}

impl LogoSection {
    /// Append a variant and select it.
    pub fn add_variant(&mut self, url: Url) {
        self.variants.push(url);
        self.selected = Some(self.variants.len() - 1);
    }

    /// Select an existing variant. Returns whether the index exists.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.variants.len() {
            return false;
        }
        self.selected = Some(index);
        true
    }

    /// URL of the selected variant.
    #[must_use]
    pub fn selected_url(&self) -> Option<&Url> {
        self.selected.and_then(|i| self.variants.get(i))
    }
}

/// Products or collections, with how they were filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemList<T> {
    #[serde(default)]
    pub source: ItemSource,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> Default for ItemList<T> {
    fn default() -> Self {
        Self {
            source: ItemSource::default(),
            items: Vec::new(),
        }
    }
}

/// A product being edited in the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    pub price: Option<Decimal>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<Url>,
    #[serde(default)]
    pub options: Vec<VariantOption>,
}

impl ProductDraft {
    /// Empty product with a fresh ID.
    #[must_use]
    pub fn new(name: impl Into<String>, price: Option<Decimal>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            price,
            description: String::new(),
            images: Vec::new(),
            options: Vec::new(),
        }
    }

    /// Whether the product has a name and a positive price.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && self.price.is_some_and(|p| p > Decimal::ZERO)
    }

    /// Variant option by name.
    pub fn option_mut(&mut self, name: &str) -> Option<&mut VariantOption> {
        self.options.iter_mut().find(|o| o.name == name)
    }
}

impl From<ProductSuggestion> for ProductDraft {
    fn from(suggestion: ProductSuggestion) -> Self {
        Self {
            description: suggestion.description,
            ..Self::new(suggestion.name, Some(suggestion.price))
        }
    }
}

/// A collection being edited in the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDraft {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub image: Option<Url>,
    #[serde(default)]
    pub product_ids: Vec<Uuid>,
}

impl CollectionDraft {
    /// Empty collection with a fresh ID.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            image: None,
            product_ids: Vec::new(),
        }
    }

    /// Build from a suggestion, resolving product names against `products`.
    ///
    /// Names that match no product are ignored.
    #[must_use]
    pub fn from_suggestion(suggestion: CollectionSuggestion, products: &[ProductDraft]) -> Self {
        let product_ids = suggestion
            .product_names
            .iter()
            .filter_map(|wanted| {
                products
                    .iter()
                    .find(|p| p.name.trim().eq_ignore_ascii_case(wanted.trim()))
                    .map(|p| p.id)
            })
            .fold(Vec::new(), |mut ids, id| {
                if !ids.contains(&id) {
                    ids.push(id);
                }
                ids
            });

        Self {
            description: suggestion.description,
            product_ids,
            ..Self::new(suggestion.name)
        }
    }
}

/// Everything entered in the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreDraft {
    #[serde(default)]
    pub import: ImportMethod,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub logo: LogoSection,
    #[serde(default)]
    pub products: ItemList<ProductDraft>,
    #[serde(default)]
    pub collections: ItemList<CollectionDraft>,
    #[serde(default)]
    pub style_prompt: String,
}

impl StoreDraft {
    /// One-line store concept used to prompt the generator.
    #[must_use]
    pub fn concept(&self) -> String {
        let base = match &self.import {
            ImportMethod::ProductType { product_type } if !product_type.trim().is_empty() => {
                format!("a store selling {}", product_type.trim())
            }
            ImportMethod::Description { text } if !text.trim().is_empty() => {
                text.trim().to_string()
            }
            _ => "a general online store".to_string(),
        };

        let name = self.name.trim();
        if name.is_empty() {
            base
        } else {
            format!("{base} called \"{name}\"")
        }
    }

    /// Add a product by hand. Returns its ID.
    pub fn add_product(&mut self, product: ProductDraft) -> Uuid {
        let id = product.id;
        self.products.items.push(product);
        id
    }

    /// Product by ID.
    #[must_use]
    pub fn product(&self, id: Uuid) -> Option<&ProductDraft> {
        self.products.items.iter().find(|p| p.id == id)
    }

    /// Mutable product by ID.
    pub fn product_mut(&mut self, id: Uuid) -> Option<&mut ProductDraft> {
        self.products.items.iter_mut().find(|p| p.id == id)
    }

    /// Remove a product and its collection memberships.
    pub fn remove_product(&mut self, id: Uuid) -> Option<ProductDraft> {
        let index = self.products.items.iter().position(|p| p.id == id)?;
        for collection in &mut self.collections.items {
            collection.product_ids.retain(|pid| *pid != id);
        }
        Some(self.products.items.remove(index))
    }

    /// Add a collection by hand. Returns its ID.
    pub fn add_collection(&mut self, collection: CollectionDraft) -> Uuid {
        let id = collection.id;
        self.collections.items.push(collection);
        id
    }

    /// Mutable collection by ID.
    pub fn collection_mut(&mut self, id: Uuid) -> Option<&mut CollectionDraft> {
        self.collections.items.iter_mut().find(|c| c.id == id)
    }

    /// Remove a collection.
    pub fn remove_collection(&mut self, id: Uuid) -> Option<CollectionDraft> {
        let index = self.collections.items.iter().position(|c| c.id == id)?;
        Some(self.collections.items.remove(index))
    }

    /// Append generated products.
    pub fn extend_generated_products(&mut self, products: impl IntoIterator<Item = ProductDraft>) {
        self.products.source = ItemSource::Generated;
        self.products.items.extend(products);
    }

    /// Append generated collections, resolving their product names.
    pub fn extend_generated_collections(
        &mut self,
        collections: impl IntoIterator<Item = CollectionSuggestion>,
    ) {
        let resolved: Vec<_> = collections
            .into_iter()
            .map(|c| CollectionDraft::from_suggestion(c, &self.products.items))
            .collect();
        self.collections.source = ItemSource::Generated;
        self.collections.items.extend(resolved);
    }

    /// Product names, in list order.
    #[must_use]
    pub fn product_names(&self) -> Vec<&str> {
        self.products.items.iter().map(|p| p.name.as_str()).collect()
    }
}
