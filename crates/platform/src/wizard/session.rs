//! A wizard bound to an account and the AI assistant.
//!
//! Assists never move the step. A failed assist leaves the draft untouched
//! and reports a [`Notice`]: an insufficient balance opens the upsell dialog,
//! anything else becomes a toast.

use std::time::Instant;

use storeloom_core::{AccountId, Surface};
use tracing::instrument;
use url::Url;
use uuid::Uuid;

use super::{ProductDraft, StoreGenerationRequest, ValidationError, Wizard};
use crate::error::{AppError, Notice};
use crate::services::assist::{AssistOutput, AssistRequest, Assistant};
use crate::signal::ToastQueue;

/// Wizard plus the AI assists available while filling it in.
#[derive(Debug)]
pub struct WizardSession {
    wizard: Wizard,
    assistant: Assistant,
    account: AccountId,
    toasts: ToastQueue,
    upsell_open: bool,
}

impl WizardSession {
    /// Start an empty wizard for `account`.
    #[must_use]
    pub fn new(assistant: Assistant, account: AccountId) -> Self {
        Self::with_wizard(Wizard::new(), assistant, account)
    }

    /// Resume an existing wizard.
    #[must_use]
    pub fn with_wizard(wizard: Wizard, assistant: Assistant, account: AccountId) -> Self {
        Self {
            wizard,
            assistant,
            account,
            toasts: ToastQueue::new(),
            upsell_open: false,
        }
    }

    #[must_use]
    pub const fn wizard(&self) -> &Wizard {
        &self.wizard
    }

    pub const fn wizard_mut(&mut self) -> &mut Wizard {
        &mut self.wizard
    }

    #[must_use]
    pub const fn account(&self) -> &AccountId {
        &self.account
    }

    pub const fn toasts_mut(&mut self) -> &mut ToastQueue {
        &mut self.toasts
    }

    /// Whether the "buy more credits" dialog is showing.
    #[must_use]
    pub const fn is_upsell_open(&self) -> bool {
        self.upsell_open
    }

    pub const fn close_upsell(&mut self) {
        self.upsell_open = false;
    }

    /// Suggest a store name from the concept and fill it in.
    ///
    /// # Errors
    ///
    /// Returns the notice shown to the user when the assist fails.
    pub async fn suggest_name(&mut self) -> Result<(), Notice> {
        let request = AssistRequest::StoreName {
            context: self.wizard.draft().concept(),
        };
        if let AssistOutput::StoreName { name } = self.assist(request).await? {
            self.wizard.draft_mut().name = name;
        }
        Ok(())
    }

    /// Generate a logo variant and select it.
    ///
    /// # Errors
    ///
    /// Returns the notice shown to the user when the assist fails.
    pub async fn generate_logo(&mut self) -> Result<(), Notice> {
        let draft = self.wizard.draft();
        let store_name = if draft.name.trim().is_empty() {
            draft.concept()
        } else {
            draft.name.trim().to_string()
        };
        let request = AssistRequest::Logo {
            store_name,
            style: draft.style_prompt.clone(),
        };
        if let AssistOutput::Image { url } = self.assist(request).await? {
            self.wizard.draft_mut().logo.add_variant(url);
        }
        Ok(())
    }

    /// Generate `count` products and append them.
    ///
    /// # Errors
    ///
    /// Returns the notice shown to the user when the assist fails.
    pub async fn generate_products(&mut self, count: usize) -> Result<(), Notice> {
        let request = AssistRequest::Products {
            context: self.wizard.draft().concept(),
            count,
        };
        if let AssistOutput::Products { products } = self.assist(request).await? {
            self.wizard
                .draft_mut()
                .extend_generated_products(products.into_iter().map(ProductDraft::from));
        }
        Ok(())
    }

    /// Generate `count` collections over the current products and append them.
    ///
    /// # Errors
    ///
    /// Returns the notice shown to the user when the assist fails.
    pub async fn generate_collections(&mut self, count: usize) -> Result<(), Notice> {
        let draft = self.wizard.draft();
        let request = AssistRequest::Collections {
            context: draft.concept(),
            product_names: draft.product_names().into_iter().map(String::from).collect(),
            count,
        };
        if let AssistOutput::Collections { collections } = self.assist(request).await? {
            self.wizard
                .draft_mut()
                .extend_generated_collections(collections);
        }
        Ok(())
    }

    /// Generate an image for a product and append it to its images.
    ///
    /// # Errors
    ///
    /// Returns the notice shown to the user when the product is unknown or
    /// the assist fails.
    pub async fn generate_product_image(&mut self, product_id: Uuid) -> Result<(), Notice> {
        let product = self.find_product(product_id)?;
        let request = AssistRequest::ProductImage {
            name: product.name.clone(),
            description: product.description.clone(),
        };
        let url = self.assist_image(request).await?;
        self.attach_image(product_id, url);
        Ok(())
    }

    /// Edit one of a product's images with `prompt`, appending the result.
    ///
    /// # Errors
    ///
    /// Returns the notice shown to the user when the product or image is
    /// unknown or the assist fails.
    pub async fn edit_product_image(
        &mut self,
        product_id: Uuid,
        index: usize,
        prompt: &str,
    ) -> Result<(), Notice> {
        let product = self.find_product(product_id)?;
        let Some(source) = product.images.get(index).cloned() else {
            return Err(self.surface(AppError::NotFound(format!(
                "image {} of product {}",
                index + 1,
                product.name
            ))));
        };
        let request = AssistRequest::EditImage {
            source,
            prompt: prompt.to_string(),
        };
        let url = self.assist_image(request).await?;
        self.attach_image(product_id, url);
        Ok(())
    }

    /// Finish the wizard and assemble the generation payload.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the wizard is not on its last step
    /// or the draft is incomplete.
    pub fn submit(self) -> Result<StoreGenerationRequest, ValidationError> {
        self.wizard.submit()
    }

    #[instrument(skip_all, fields(account = %self.account, step = %self.wizard.step()))]
    async fn assist(&mut self, request: AssistRequest) -> Result<AssistOutput, Notice> {
        let result = self.assistant.run(&self.account, request).await;
        result.map_err(|e| self.surface(AppError::from(e)))
    }

    async fn assist_image(&mut self, request: AssistRequest) -> Result<Url, Notice> {
        match self.assist(request).await? {
            AssistOutput::Image { url } => Ok(url),
            other => Err(self.surface(AppError::Internal(format!(
                "unexpected assist output: {other:?}"
            )))),
        }
    }

    fn find_product(&mut self, product_id: Uuid) -> Result<ProductDraft, Notice> {
        let found = self.wizard.draft().product(product_id).cloned();
        match found {
            Some(product) => Ok(product),
            None => Err(self.surface(AppError::NotFound(format!("product {product_id}")))),
        }
    }

    // The product may have been removed while the assist was running.
    fn attach_image(&mut self, product_id: Uuid, url: Url) {
        if let Some(product) = self.wizard.draft_mut().product_mut(product_id) {
            product.images.push(url);
        }
    }

    fn surface(&mut self, error: AppError) -> Notice {
        let notice = error.notice();
        match notice.surface {
            Surface::UpsellDialog => self.upsell_open = true,
            Surface::Toast => {
                self.toasts
                    .push(notice.message.clone(), notice.kind, Instant::now());
            }
            Surface::Inline => {}
        }
        notice
    }
}
