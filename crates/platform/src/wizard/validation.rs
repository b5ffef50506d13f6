//! Per-step validation predicates.

use storeloom_core::ItemSource;
use thiserror::Error;

use super::WizardStep;
use super::draft::{ImportMethod, StoreDraft};

/// Why a step cannot be left.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Enter a product type")]
    MissingProductType,

    #[error("Describe your store")]
    MissingDescription,

    #[error("Enter a store name")]
    MissingStoreName,

    #[error("Product {} needs a name", .index + 1)]
    ProductMissingName { index: usize },

    #[error("Product {} needs a price greater than zero", .index + 1)]
    ProductInvalidPrice { index: usize },

    #[error("Generate at least one product")]
    NoProducts,

    #[error("Collection {} needs a name", .index + 1)]
    CollectionMissingName { index: usize },

    #[error("Generate at least one collection")]
    NoCollections,

    #[error("The wizard is already on its last step")]
    AtLastStep,

    #[error("The wizard is not on its last step")]
    NotAtLastStep,
}

impl ValidationError {
    /// Form field the error belongs to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::MissingProductType => "product_type",
            Self::MissingDescription => "description",
            Self::MissingStoreName => "name",
            Self::ProductMissingName { .. } | Self::ProductInvalidPrice { .. } | Self::NoProducts => {
                "products"
            }
            Self::CollectionMissingName { .. } | Self::NoCollections => "collections",
            Self::AtLastStep | Self::NotAtLastStep => "step",
        }
    }
}

/// Check whether `step` may be left going forward.
///
/// # Errors
///
/// Returns the first failing rule. The terminal step always fails with
/// [`ValidationError::AtLastStep`].
pub fn validate_step(step: WizardStep, draft: &StoreDraft) -> Result<(), ValidationError> {
    match step {
        WizardStep::Source => validate_source(&draft.import),
        WizardStep::Name => validate_name(&draft.name),
        WizardStep::Logo | WizardStep::StylePrompt => Ok(()),
        WizardStep::Products => validate_products(draft),
        WizardStep::Collections => validate_collections(draft),
        WizardStep::Submit => Err(ValidationError::AtLastStep),
    }
}

fn validate_source(import: &ImportMethod) -> Result<(), ValidationError> {
    match import {
        ImportMethod::ProductType { product_type } if product_type.trim().is_empty() => {
            Err(ValidationError::MissingProductType)
        }
        ImportMethod::Description { text } if text.trim().is_empty() => {
            Err(ValidationError::MissingDescription)
        }
        ImportMethod::ProductType { .. } | ImportMethod::Description { .. } | ImportMethod::Scratch => {
            Ok(())
        }
    }
}

pub(crate) fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::MissingStoreName);
    }
    Ok(())
}

fn validate_products(draft: &StoreDraft) -> Result<(), ValidationError> {
    match draft.products.source {
        ItemSource::Manual => validate_each_product(draft),
        ItemSource::Generated if draft.products.items.is_empty() => {
            Err(ValidationError::NoProducts)
        }
        ItemSource::Generated => Ok(()),
    }
}

/// Every product has a name and a positive price.
pub(crate) fn validate_each_product(draft: &StoreDraft) -> Result<(), ValidationError> {
    for (index, product) in draft.products.items.iter().enumerate() {
        if product.name.trim().is_empty() {
            return Err(ValidationError::ProductMissingName { index });
        }
        if !product.is_complete() {
            return Err(ValidationError::ProductInvalidPrice { index });
        }
    }
    Ok(())
}

fn validate_collections(draft: &StoreDraft) -> Result<(), ValidationError> {
    match draft.collections.source {
        ItemSource::Manual => validate_each_collection(draft),
        ItemSource::Generated if draft.collections.items.is_empty() => {
            Err(ValidationError::NoCollections)
        }
        ItemSource::Generated => Ok(()),
    }
}

/// Every collection has a name.
pub(crate) fn validate_each_collection(draft: &StoreDraft) -> Result<(), ValidationError> {
    match draft
        .collections
        .items
        .iter()
        .position(|c| c.name.trim().is_empty())
    {
        Some(index) => Err(ValidationError::CollectionMissingName { index }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::wizard::draft::{CollectionDraft, ProductDraft};

    #[test]
    fn test_source_rules() {
        let mut draft = StoreDraft::default();
        assert_eq!(
            validate_step(WizardStep::Source, &draft),
            Err(ValidationError::MissingProductType)
        );

        draft.import = ImportMethod::ProductType {
            product_type: "Fashion".to_string(),
        };
        assert_eq!(validate_step(WizardStep::Source, &draft), Ok(()));

        draft.import = ImportMethod::Description {
            text: "   ".to_string(),
        };
        assert_eq!(
            validate_step(WizardStep::Source, &draft),
            Err(ValidationError::MissingDescription)
        );

        draft.import = ImportMethod::Scratch;
        assert_eq!(validate_step(WizardStep::Source, &draft), Ok(()));
    }

    #[test]
    fn test_name_is_trimmed() {
        let mut draft = StoreDraft {
            name: "  ".to_string(),
            ..StoreDraft::default()
        };
        assert_eq!(
            validate_step(WizardStep::Name, &draft),
            Err(ValidationError::MissingStoreName)
        );
        draft.name = "Thread".to_string();
        assert_eq!(validate_step(WizardStep::Name, &draft), Ok(()));
    }

    #[test]
    fn test_optional_steps_always_pass() {
        let draft = StoreDraft::default();
        assert_eq!(validate_step(WizardStep::Logo, &draft), Ok(()));
        assert_eq!(validate_step(WizardStep::StylePrompt, &draft), Ok(()));
    }

    #[test]
    fn test_manual_products_need_name_and_positive_price() {
        let mut draft = StoreDraft::default();
        assert_eq!(validate_step(WizardStep::Products, &draft), Ok(()));

        draft.add_product(ProductDraft::new("Shirt", Some(Decimal::new(20, 0))));
        let hat = draft.add_product(ProductDraft::new("Hat", None));
        assert_eq!(
            validate_step(WizardStep::Products, &draft),
            Err(ValidationError::ProductInvalidPrice { index: 1 })
        );

        draft.product_mut(hat).expect("hat").price = Some(Decimal::ZERO);
        assert_eq!(
            validate_step(WizardStep::Products, &draft),
            Err(ValidationError::ProductInvalidPrice { index: 1 })
        );

        let hat = draft.product_mut(hat).expect("hat");
        hat.price = Some(Decimal::new(15, 0));
        hat.name = " ".to_string();
        assert_eq!(
            validate_step(WizardStep::Products, &draft),
            Err(ValidationError::ProductMissingName { index: 1 })
        );
    }

    #[test]
    fn test_generated_products_need_at_least_one() {
        let mut draft = StoreDraft::default();
        draft.products.source = ItemSource::Generated;
        assert_eq!(
            validate_step(WizardStep::Products, &draft),
            Err(ValidationError::NoProducts)
        );
        draft.extend_generated_products([ProductDraft::new("Shirt", Some(Decimal::ONE))]);
        assert_eq!(validate_step(WizardStep::Products, &draft), Ok(()));
    }

    #[test]
    fn test_collection_rules() {
        let mut draft = StoreDraft::default();
        draft.add_collection(CollectionDraft::new(""));
        assert_eq!(
            validate_step(WizardStep::Collections, &draft),
            Err(ValidationError::CollectionMissingName { index: 0 })
        );

        draft.collections.items.clear();
        draft.collections.source = ItemSource::Generated;
        assert_eq!(
            validate_step(WizardStep::Collections, &draft),
            Err(ValidationError::NoCollections)
        );
    }

    #[test]
    fn test_error_messages_are_one_based() {
        assert_eq!(
            ValidationError::ProductMissingName { index: 0 }.to_string(),
            "Product 1 needs a name"
        );
        assert_eq!(ValidationError::NoProducts.field(), "products");
    }
}
