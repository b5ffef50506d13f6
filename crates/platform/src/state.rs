//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::SecretString;
use sqlx::PgPool;
use storeloom_core::AccountId;
use thiserror::Error;

use crate::billing::{BillingClient, BillingError, BillingFunctions, EventLedger, WebhookHandler};
use crate::config::PlatformConfig;
use crate::credits::{BalanceStore, Balances, CreditGate};
use crate::db::{PgBalanceStore, PgEventLedger, PgStoreRepository, StoreRecords};
use crate::feed::{Feed, NotificationCenter};
use crate::generation::{ContentGenerator, GenerationClient, GenerationError};
use crate::identity::{AuthError, IdentityClient, IdentityProvider};
use crate::services::{Assistant, StoreGenerationService};
use crate::signal::{GenerationSignal, SignalHub};
use crate::storage::{HttpMediaStorage, MediaStorage, StorageError};

/// Error building the state from configuration.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("generation client: {0}")]
    Generation(#[from] GenerationError),
    #[error("media storage: {0}")]
    Storage(#[from] StorageError),
    #[error("identity client: {0}")]
    Identity(#[from] AuthError),
    #[error("billing client: {0}")]
    Billing(#[from] BillingError),
}

/// Billing collaborators, present only when billing is configured.
pub struct BillingParts {
    pub functions: Arc<dyn BillingFunctions>,
    pub ledger: Arc<dyn EventLedger>,
    pub webhook_secret: SecretString,
}

/// Collaborators the state is assembled from.
pub struct StateParts {
    pub balances: Arc<dyn BalanceStore>,
    pub generator: Arc<dyn ContentGenerator>,
    pub storage: Arc<dyn MediaStorage>,
    pub stores: Arc<dyn StoreRecords>,
    pub identity: Arc<dyn IdentityProvider>,
    pub billing: Option<BillingParts>,
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    balances: Balances,
    assistant: Assistant,
    store_generation: StoreGenerationService,
    stores: Arc<dyn StoreRecords>,
    progress: SignalHub<AccountId, GenerationSignal>,
    identity: Arc<dyn IdentityProvider>,
    billing: Option<Arc<dyn BillingFunctions>>,
    webhook: Option<WebhookHandler>,
    feed: Feed,
}

impl AppState {
    /// Assemble the state from its collaborators.
    #[must_use]
    pub fn new(parts: StateParts) -> Self {
        let balances = Balances::new(parts.balances);
        let gate = CreditGate::new(balances.clone());
        let progress = SignalHub::new();

        let assistant = Assistant::new(
            gate.clone(),
            Arc::clone(&parts.generator),
            Arc::clone(&parts.storage),
        );
        let store_generation = StoreGenerationService::new(
            gate,
            parts.generator,
            parts.storage,
            Arc::clone(&parts.stores),
            progress.clone(),
        );

        let (billing, webhook) = match parts.billing {
            Some(billing) => (
                Some(billing.functions),
                Some(WebhookHandler::new(
                    balances.clone(),
                    billing.ledger,
                    billing.webhook_secret,
                )),
            ),
            None => (None, None),
        };

        Self {
            inner: Arc::new(AppStateInner {
                balances,
                assistant,
                store_generation,
                stores: parts.stores,
                progress,
                identity: parts.identity,
                billing,
                webhook,
                feed: Feed::new(NotificationCenter::new()),
            }),
        }
    }

    /// Build the production state: `PostgreSQL` repositories and HTTP clients.
    ///
    /// # Errors
    ///
    /// Returns an error if any client cannot be constructed.
    pub fn from_config(config: &PlatformConfig, pool: &PgPool) -> Result<Self, StateError> {
        let billing = match &config.billing {
            Some(billing) => Some(BillingParts {
                functions: Arc::new(BillingClient::new(billing.functions_url.clone())?),
                ledger: Arc::new(PgEventLedger::new(pool.clone())),
                webhook_secret: billing.webhook_secret.clone(),
            }),
            None => None,
        };

        Ok(Self::new(StateParts {
            balances: Arc::new(PgBalanceStore::new(pool.clone())),
            generator: Arc::new(GenerationClient::new(&config.generation)?),
            storage: Arc::new(HttpMediaStorage::new(&config.storage)?),
            stores: Arc::new(PgStoreRepository::new(pool.clone())),
            identity: Arc::new(IdentityClient::new(&config.identity)?),
            billing,
        }))
    }

    #[must_use]
    pub fn balances(&self) -> &Balances {
        &self.inner.balances
    }

    #[must_use]
    pub fn assistant(&self) -> &Assistant {
        &self.inner.assistant
    }

    #[must_use]
    pub fn store_generation(&self) -> &StoreGenerationService {
        &self.inner.store_generation
    }

    #[must_use]
    pub fn stores(&self) -> &dyn StoreRecords {
        self.inner.stores.as_ref()
    }

    /// Per-account store generation progress.
    #[must_use]
    pub fn progress(&self) -> &SignalHub<AccountId, GenerationSignal> {
        &self.inner.progress
    }

    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }

    /// Billing functions, if billing is configured.
    #[must_use]
    pub fn billing(&self) -> Option<&dyn BillingFunctions> {
        self.inner.billing.as_deref()
    }

    /// Webhook handler, if billing is configured.
    #[must_use]
    pub fn webhook(&self) -> Option<&WebhookHandler> {
        self.inner.webhook.as_ref()
    }

    #[must_use]
    pub fn feed(&self) -> &Feed {
        &self.inner.feed
    }
}
