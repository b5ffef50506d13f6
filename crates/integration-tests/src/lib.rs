//! In-memory collaborators for Storeloom integration tests.
//!
//! Every external service the platform talks to has a fake here, so the
//! full stack (gate, wizard, services, router) runs without a database or
//! network.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p storeloom-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use sha2::Sha256;
use storeloom::billing::{
    BillingError, BillingFunctions, CheckoutRequest, MemoryEventLedger, ProductCheckoutRequest,
    ReturnRequest,
};
use storeloom::credits::MemoryBalanceStore;
use storeloom::db::{RepositoryError, StoreRecords};
use storeloom::generation::{CompletionRequest, ContentGenerator, GeneratedMedia, GenerationError};
use storeloom::identity::{AccountSession, AuthError, IdentityProvider, SignInForm, SignedIn};
use storeloom::models::{NewStore, StoreRecord};
use storeloom::state::{AppState, BillingParts, StateParts};
use storeloom::storage::{MediaStorage, StorageError};
use storeloom_core::{AccountId, Credits, StoreId};
use url::Url;

/// Webhook secret used by [`TestApp`].
pub const WEBHOOK_SECRET: &str = "whsec_integration_9fQ2xLm7";

/// Products returned for any products prompt.
pub const PRODUCTS_JSON: &str = r#"```json
[
  {"name": "Speckled Mug", "price": "24.50", "description": "Stoneware mug"},
  {"name": "Bud Vase", "price": "18.00", "description": "Small vase"}
]
```"#;

/// Collections returned for any collections prompt.
pub const COLLECTIONS_JSON: &str = r#"[
  {"name": "Kitchen", "description": "For the table", "product_names": ["speckled mug"]}
]"#;

/// Scripted generator.
///
/// Text prompts are answered by keyword; images and videos are returned as
/// URLs numbered by call.
#[derive(Debug, Default)]
pub struct FakeGenerator {
    calls: AtomicUsize,
    image_calls: AtomicUsize,
    fail_text: bool,
    fail_images: bool,
    fail_pages: bool,
}

impl FakeGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every completion fails with a 503.
    #[must_use]
    pub fn failing_text() -> Self {
        Self {
            fail_text: true,
            ..Self::default()
        }
    }

    /// Every image generation fails.
    #[must_use]
    pub fn failing_images() -> Self {
        Self {
            fail_images: true,
            ..Self::default()
        }
    }

    /// Every page generation fails.
    #[must_use]
    pub fn failing_pages() -> Self {
        Self {
            fail_pages: true,
            ..Self::default()
        }
    }

    /// Total calls of any kind.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Image generation calls.
    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    fn unavailable() -> GenerationError {
        GenerationError::Api {
            status: 503,
            message: "model overloaded".into(),
        }
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_text {
            return Err(Self::unavailable());
        }
        let answer = if request.prompt.starts_with("Suggest one short") {
            "\"Kiln & Co\""
        } else if request.prompt.contains("collections") {
            COLLECTIONS_JSON
        } else {
            PRODUCTS_JSON
        };
        Ok(answer.to_string())
    }

    async fn generate_image(&self, _prompt: &str) -> Result<GeneratedMedia, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let n = self.image_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_images {
            return Err(Self::unavailable());
        }
        Ok(GeneratedMedia::Url {
            url: Url::parse(&format!("https://gen.test/images/{n}.png")).unwrap(),
        })
    }

    async fn edit_image(
        &self,
        _source: &Url,
        _prompt: &str,
    ) -> Result<GeneratedMedia, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GeneratedMedia::Inline {
            mime_type: "image/png".into(),
            data: "iVBORw0KGgo=".into(),
        })
    }

    async fn generate_page(&self, prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_pages {
            return Err(Self::unavailable());
        }
        Ok(format!("<main data-prompt-len=\"{}\"></main>", prompt.len()))
    }

    async fn generate_video(
        &self,
        _source: &Url,
        _prompt: &str,
    ) -> Result<GeneratedMedia, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GeneratedMedia::Url {
            url: Url::parse("https://gen.test/videos/1.mp4").unwrap(),
        })
    }
}

/// Storage that keeps uploads in memory.
#[derive(Debug, Default)]
pub struct RecordingStorage {
    uploads: Mutex<Vec<(String, usize, String)>>,
}

impl RecordingStorage {
    /// `(path, byte length, content type)` of each upload.
    pub fn uploads(&self) -> Vec<(String, usize, String)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaStorage for RecordingStorage {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<Url, StorageError> {
        self.uploads
            .lock()
            .unwrap()
            .push((path.to_string(), bytes.len(), content_type.to_string()));
        Ok(Url::parse("https://cdn.test/").unwrap().join(path).unwrap())
    }
}

/// Store records held in memory.
#[derive(Debug, Default)]
pub struct MemoryStores {
    stores: Mutex<Vec<StoreRecord>>,
}

impl MemoryStores {
    pub fn all(&self) -> Vec<StoreRecord> {
        self.stores.lock().unwrap().clone()
    }
}

#[async_trait]
impl StoreRecords for MemoryStores {
    async fn create(&self, store: NewStore) -> Result<StoreRecord, RepositoryError> {
        let mut stores = self.stores.lock().unwrap();
        let record = StoreRecord {
            id: StoreId::new(format!("store-{}", stores.len() + 1)),
            owner: store.owner,
            name: store.name,
            logo_url: store.logo_url,
            products: store.products,
            collections: store.collections,
            theme: store.theme,
            created_at: Utc::now(),
        };
        stores.push(record.clone());
        Ok(record)
    }

    async fn get(&self, id: &StoreId) -> Result<Option<StoreRecord>, RepositoryError> {
        Ok(self
            .stores
            .lock()
            .unwrap()
            .iter()
            .find(|s| &s.id == id)
            .cloned())
    }

    async fn list_for_owner(&self, owner: &AccountId) -> Result<Vec<StoreRecord>, RepositoryError> {
        Ok(self
            .stores
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|s| &s.owner == owner)
            .cloned()
            .collect())
    }
}

/// Identity provider accepting `token-<account>` bearer tokens.
///
/// Password sign-in accepts any email with the password `correct horse`.
#[derive(Debug, Default)]
pub struct FakeIdentity;

impl FakeIdentity {
    /// Bearer token for `account`.
    #[must_use]
    pub fn token_for(account: &str) -> String {
        format!("token-{account}")
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn verify_token(&self, token: &str) -> Result<AccountSession, AuthError> {
        let account = token
            .strip_prefix("token-")
            .filter(|a| !a.is_empty())
            .ok_or(AuthError::InvalidToken)?;
        Ok(AccountSession {
            account_id: AccountId::new(account),
            email: Some(format!("{account}@example.test")),
            display_name: None,
        })
    }

    async fn sign_in(&self, form: &SignInForm) -> Result<SignedIn, AuthError> {
        if form.password != "correct horse" {
            return Err(AuthError::InvalidCredential);
        }
        let account = form.email.split('@').next().unwrap_or_default().to_string();
        Ok(SignedIn {
            id_token: Self::token_for(&account),
            session: AccountSession {
                account_id: AccountId::new(account),
                email: Some(form.email.clone()),
                display_name: None,
            },
        })
    }
}

/// Billing functions returning predictable hosted URLs.
#[derive(Debug, Default)]
pub struct FakeBilling {
    requests: Mutex<Vec<(&'static str, AccountId)>>,
}

impl FakeBilling {
    pub fn requests(&self) -> Vec<(&'static str, AccountId)> {
        self.requests.lock().unwrap().clone()
    }

    fn url(&self, function: &'static str, account: &AccountId) -> Result<Url, BillingError> {
        self.requests
            .lock()
            .unwrap()
            .push((function, account.clone()));
        Ok(Url::parse(&format!("https://billing.test/{function}/{account}")).unwrap())
    }
}

#[async_trait]
impl BillingFunctions for FakeBilling {
    async fn create_checkout_session(
        &self,
        account: &AccountId,
        _request: &CheckoutRequest,
    ) -> Result<Url, BillingError> {
        self.url("checkout", account)
    }

    async fn create_connect_link(
        &self,
        account: &AccountId,
        _request: &ReturnRequest,
    ) -> Result<Url, BillingError> {
        self.url("connect", account)
    }

    async fn create_portal_session(
        &self,
        account: &AccountId,
        _request: &ReturnRequest,
    ) -> Result<Url, BillingError> {
        self.url("portal", account)
    }

    async fn create_product_checkout(
        &self,
        account: &AccountId,
        _request: &ProductCheckoutRequest,
    ) -> Result<Url, BillingError> {
        self.url("product-checkout", account)
    }
}

/// An [`AppState`] over fakes, with handles to inspect them.
pub struct TestApp {
    pub state: AppState,
    pub balances: MemoryBalanceStore,
    pub generator: Arc<FakeGenerator>,
    pub storage: Arc<RecordingStorage>,
    pub stores: Arc<MemoryStores>,
    pub billing: Arc<FakeBilling>,
}

impl TestApp {
    /// Fakes with billing configured and a working generator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_generator(FakeGenerator::new())
    }

    #[must_use]
    pub fn with_generator(generator: FakeGenerator) -> Self {
        let balances = MemoryBalanceStore::new();
        let generator = Arc::new(generator);
        let storage = Arc::new(RecordingStorage::default());
        let stores = Arc::new(MemoryStores::default());
        let billing = Arc::new(FakeBilling::default());

        let state = AppState::new(StateParts {
            balances: Arc::new(balances.clone()),
            generator: Arc::clone(&generator) as Arc<dyn ContentGenerator>,
            storage: Arc::clone(&storage) as Arc<dyn MediaStorage>,
            stores: Arc::clone(&stores) as Arc<dyn StoreRecords>,
            identity: Arc::new(FakeIdentity),
            billing: Some(BillingParts {
                functions: Arc::clone(&billing) as Arc<dyn BillingFunctions>,
                ledger: Arc::new(MemoryEventLedger::default()),
                webhook_secret: SecretString::from(WEBHOOK_SECRET),
            }),
        });

        Self {
            state,
            balances,
            generator,
            storage,
            stores,
            billing,
        }
    }

    /// Set an account's balance before the test runs.
    pub async fn set_balance(&self, account: &str, credits: i64) {
        use storeloom::credits::BalanceStore;

        let account = AccountId::new(account);
        let current = self.balances.get_or_init(&account).await.unwrap();
        let delta = credits - current.get();
        if delta > 0 {
            self.balances.grant(&account, Credits::new(delta)).await.unwrap();
        } else if delta < 0 {
            self.balances
                .try_debit(&account, Credits::new(-delta))
                .await
                .unwrap();
        }
    }

    /// Current balance without initializing.
    pub fn balance(&self, account: &str) -> Option<i64> {
        self.balances.peek(&AccountId::new(account)).map(Credits::get)
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// `Stripe-Signature` header for `payload` signed at `timestamp`.
#[must_use]
pub fn sign_webhook(payload: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

/// A `checkout.session.completed` event granting `credits` to `account`.
#[must_use]
pub fn completed_checkout(event_id: &str, account: &str, credits: i64) -> String {
    serde_json::json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": {"object": {"metadata": {"account_id": account, "credits": credits.to_string()}}}
    })
    .to_string()
}
