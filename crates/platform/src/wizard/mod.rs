//! Store generation wizard.
//!
//! A linear form of six steps plus a terminal submit step. Forward movement
//! is gated by [`validate_step`]; backward movement is always allowed down to
//! the first step. AI-assisted edits live in [`WizardSession`] and never move
//! the step.
//!
//! ```text
//! Source → Name → Logo → Products → Collections → StylePrompt → Submit
//! ```

pub mod draft;
pub mod session;
pub mod validation;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storeloom_core::{AccountId, CurrencyCode, Price};
use url::Url;

use crate::models::{NewStore, StoreCollection, StoreProduct, StoreTheme};

pub use draft::{CollectionDraft, ImportMethod, ItemList, LogoSection, ProductDraft, StoreDraft};
pub use session::WizardSession;
pub use validation::{ValidationError, validate_step};

/// A wizard step.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    Source,
    Name,
    Logo,
    Products,
    Collections,
    StylePrompt,
    Submit,
}

impl WizardStep {
    /// All steps in order.
    pub const ALL: [Self; 7] = [
        Self::Source,
        Self::Name,
        Self::Logo,
        Self::Products,
        Self::Collections,
        Self::StylePrompt,
        Self::Submit,
    ];

    /// 1-based position.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Source => 1,
            Self::Name => 2,
            Self::Logo => 3,
            Self::Products => 4,
            Self::Collections => 5,
            Self::StylePrompt => 6,
            Self::Submit => 7,
        }
    }

    /// Step at a 1-based position.
    #[must_use]
    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.number() == number)
    }

    /// The following step, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Source => Some(Self::Name),
            Self::Name => Some(Self::Logo),
            Self::Logo => Some(Self::Products),
            Self::Products => Some(Self::Collections),
            Self::Collections => Some(Self::StylePrompt),
            Self::StylePrompt => Some(Self::Submit),
            Self::Submit => None,
        }
    }

    /// The preceding step, if any.
    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Source => None,
            Self::Name => Some(Self::Source),
            Self::Logo => Some(Self::Name),
            Self::Products => Some(Self::Logo),
            Self::Collections => Some(Self::Products),
            Self::StylePrompt => Some(Self::Collections),
            Self::Submit => Some(Self::StylePrompt),
        }
    }

    /// Whether this is the submit step.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Submit)
    }

    /// Heading shown for the step.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Source => "What will you sell?",
            Self::Name => "Name your store",
            Self::Logo => "Pick a logo",
            Self::Products => "Add products",
            Self::Collections => "Group products into collections",
            Self::StylePrompt => "Describe the look",
            Self::Submit => "Generate your store",
        }
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "step {} ({})", self.number(), self.title())
    }
}

/// Wizard position and form state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Wizard {
    step: WizardStep,
    draft: StoreDraft,
}

impl Wizard {
    /// Fresh wizard on the first step.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wizard on the first step over an existing draft.
    #[must_use]
    pub fn with_draft(draft: StoreDraft) -> Self {
        Self {
            step: WizardStep::Source,
            draft,
        }
    }

    /// Current step.
    #[must_use]
    pub const fn step(&self) -> WizardStep {
        self.step
    }

    /// Form state.
    #[must_use]
    pub const fn draft(&self) -> &StoreDraft {
        &self.draft
    }

    /// Mutable form state. Editing never moves the step.
    pub fn draft_mut(&mut self) -> &mut StoreDraft {
        &mut self.draft
    }

    /// Validate the current step.
    ///
    /// # Errors
    ///
    /// Returns the first rule the current step breaks.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_step(self.step, &self.draft)
    }

    /// Whether the "next" control is disabled.
    #[must_use]
    pub fn is_next_disabled(&self) -> bool {
        self.validate().is_err()
    }

    /// Move forward one step if the current one validates.
    ///
    /// # Errors
    ///
    /// Returns the validation failure; the step is unchanged.
    pub fn advance(&mut self) -> Result<WizardStep, ValidationError> {
        self.validate()?;
        let next = self.step.next().ok_or(ValidationError::AtLastStep)?;
        tracing::debug!(from = %self.step, to = %next, "Wizard advanced");
        self.step = next;
        Ok(next)
    }

    /// Move back one step, stopping at the first.
    pub fn retreat(&mut self) -> WizardStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    /// Assemble the submit payload, consuming the wizard.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NotAtLastStep`] before the submit step.
    pub fn submit(self) -> Result<StoreGenerationRequest, ValidationError> {
        if !self.step.is_terminal() {
            return Err(ValidationError::NotAtLastStep);
        }
        let draft = self.draft;
        let logo_url = draft.logo.selected_url().cloned();
        Ok(StoreGenerationRequest {
            import: draft.import,
            name: draft.name.trim().to_string(),
            logo_url,
            products: draft.products.items,
            collections: draft.collections.items,
            style_prompt: draft.style_prompt,
        })
    }
}

/// Payload handed to store generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreGenerationRequest {
    #[serde(default)]
    pub import: ImportMethod,
    pub name: String,
    pub logo_url: Option<Url>,
    #[serde(default)]
    pub products: Vec<ProductDraft>,
    #[serde(default)]
    pub collections: Vec<CollectionDraft>,
    #[serde(default)]
    pub style_prompt: String,
}

impl StoreGenerationRequest {
    /// Check the payload can become a store.
    ///
    /// Payloads may arrive over HTTP without passing through a [`Wizard`],
    /// so the store-level rules are re-checked here.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_name(&self.name)?;
        let draft = StoreDraft {
            products: ItemList {
                items: self.products.clone(),
                ..ItemList::default()
            },
            collections: ItemList {
                items: self.collections.clone(),
                ..ItemList::default()
            },
            ..StoreDraft::default()
        };
        validation::validate_each_product(&draft)?;
        validation::validate_each_collection(&draft)
    }

    /// Product names, in order.
    #[must_use]
    pub fn product_names(&self) -> Vec<&str> {
        self.products.iter().map(|p| p.name.as_str()).collect()
    }

    /// Convert into a persistable store.
    ///
    /// Collection memberships pointing at unknown products are dropped.
    /// Products without a price are stored at zero; call
    /// [`validate`](Self::validate) first to reject them.
    #[must_use]
    pub fn into_new_store(self, owner: AccountId, landing_page_html: Option<String>) -> NewStore {
        let products: Vec<StoreProduct> = self
            .products
            .into_iter()
            .map(|p| StoreProduct {
                id: p.id,
                name: p.name.trim().to_string(),
                price: Price::new(p.price.unwrap_or(Decimal::ZERO), CurrencyCode::default()),
                description: p.description,
                images: p.images,
                options: p.options,
            })
            .collect();

        let collections = self
            .collections
            .into_iter()
            .map(|c| StoreCollection {
                id: c.id,
                name: c.name.trim().to_string(),
                description: c.description,
                image: c.image,
                product_ids: c
                    .product_ids
                    .into_iter()
                    .filter(|id| products.iter().any(|p| p.id == *id))
                    .collect(),
            })
            .collect();

        NewStore {
            owner,
            name: self.name.trim().to_string(),
            logo_url: self.logo_url,
            products,
            collections,
            theme: StoreTheme {
                style_prompt: self.style_prompt,
                landing_page_html,
            },
        }
    }
}
