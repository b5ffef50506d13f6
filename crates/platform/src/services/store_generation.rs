//! Store generation from a submitted wizard payload.
//!
//! One generation run is a single priced action. Progress is published to
//! the account's [`GenerationSignal`] as the run moves through its phases:
//!
//! | Percent | Status                    |
//! |---------|---------------------------|
//! | 5       | Checking credits          |
//! | 15      | Designing storefront      |
//! | 35..80  | Creating product images   |
//! | 90      | Saving store              |
//! | 100     | Store ready               |
//!
//! The store is saved only after the charge succeeds. The signal is
//! cleared when the run ends, whatever the outcome.

use std::sync::Arc;

use storeloom_core::{AccountId, PricedAction};
use thiserror::Error;
use tracing::instrument;

use crate::credits::{CreditGate, GateError};
use crate::db::{RepositoryError, StoreRecords};
use crate::generation::prompts;
use crate::generation::{ContentGenerator, GenerationError};
use crate::models::{NewStore, StoreRecord};
use crate::signal::{GenerationSignal, ProgressReporter, SignalHub};
use crate::storage::{self, MediaStorage, StorageError};
use crate::wizard::{StoreGenerationRequest, ValidationError};

const IMAGES_START: u8 = 35;
const IMAGES_END: u8 = 80;

/// Failure inside a store generation run.
#[derive(Debug, Error)]
pub enum StoreGenerationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Generates and saves stores.
#[derive(Clone)]
pub struct StoreGenerationService {
    gate: CreditGate,
    generator: Arc<dyn ContentGenerator>,
    storage: Arc<dyn MediaStorage>,
    stores: Arc<dyn StoreRecords>,
    progress: SignalHub<AccountId, GenerationSignal>,
}

impl std::fmt::Debug for StoreGenerationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreGenerationService")
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl StoreGenerationService {
    #[must_use]
    pub fn new(
        gate: CreditGate,
        generator: Arc<dyn ContentGenerator>,
        storage: Arc<dyn MediaStorage>,
        stores: Arc<dyn StoreRecords>,
        progress: SignalHub<AccountId, GenerationSignal>,
    ) -> Self {
        Self {
            gate,
            generator,
            storage,
            stores,
            progress,
        }
    }

    /// Hub the run's progress is published on.
    #[must_use]
    pub const fn progress(&self) -> &SignalHub<AccountId, GenerationSignal> {
        &self.progress
    }

    /// Generate and save a store for `account`.
    ///
    /// The payload is validated before any credit check. The gated action
    /// produces the storefront and images; the store is saved only once the
    /// store generation price has been charged, so a rejected debit leaves
    /// nothing behind.
    ///
    /// # Errors
    ///
    /// - [`GateError::Credits`] when the balance does not cover the price,
    ///   before or after generation
    /// - [`GateError::Action`] when validation, generation, upload or the
    ///   save fails; a failed save is refunded
    #[instrument(skip_all, fields(account = %account, store = %request.name))]
    pub async fn generate(
        &self,
        account: &AccountId,
        request: StoreGenerationRequest,
    ) -> Result<StoreRecord, GateError<StoreGenerationError>> {
        request
            .validate()
            .map_err(|e| GateError::Action(e.into()))?;

        let progress = ProgressReporter::new(self.progress.clone(), account.clone());
        progress.report(5, "Checking credits");

        let store = self
            .gate
            .run(account, PricedAction::StoreGeneration, || {
                self.build(account, request, &progress)
            })
            .await?;

        progress.report(90, "Saving store");
        let record = match self.stores.create(store).await {
            Ok(record) => record,
            Err(e) => {
                self.refund(account).await;
                return Err(GateError::Action(e.into()));
            }
        };

        progress.report(100, "Store ready");
        tracing::info!(store_id = %record.id, "Store generated");
        progress.finish();
        Ok(record)
    }

    async fn build(
        &self,
        account: &AccountId,
        mut request: StoreGenerationRequest,
        progress: &ProgressReporter,
    ) -> Result<NewStore, StoreGenerationError> {
        progress.report(15, "Designing storefront");
        let page_prompt = prompts::landing_page_prompt(
            &request.name,
            &request.style_prompt,
            &request.product_names(),
        );
        let landing_page = self.generator.generate_page(&page_prompt).await?;

        let pending: Vec<usize> = request
            .products
            .iter()
            .enumerate()
            .filter(|(_, p)| p.images.is_empty())
            .map(|(i, _)| i)
            .collect();
        let total = pending.len();

        for (done, index) in pending.into_iter().enumerate() {
            progress.report(
                image_percent(done, total),
                format!("Creating product images ({}/{total})", done + 1),
            );
            let product = &request.products[index];
            let media = self
                .generator
                .generate_image(&prompts::product_image_prompt(
                    &product.name,
                    &product.description,
                ))
                .await?;
            let url = storage::persist_generated(self.storage.as_ref(), account, media).await?;
            request.products[index].images.push(url);
        }

        Ok(request.into_new_store(account.clone(), Some(landing_page)))
    }

    // The charge is local, so a store that could not be saved is given back.
    async fn refund(&self, account: &AccountId) {
        let cost = PricedAction::StoreGeneration.cost();
        match self.gate.balances().grant(account, cost).await {
            Ok(balance) => {
                tracing::warn!(refunded = %cost, balance = %balance, "Store save failed; refunded");
            }
            Err(e) => {
                tracing::error!(error = %e, "Store save failed and refund failed");
            }
        }
    }
}

/// Percent shown before generating image `done` of `total`.
fn image_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return IMAGES_START;
    }
    let span = usize::from(IMAGES_END - IMAGES_START);
    let offset = span * done / total;
    IMAGES_START.saturating_add(u8::try_from(offset).unwrap_or(u8::MAX))
}
