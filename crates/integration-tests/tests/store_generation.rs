//! End-to-end store generation over in-memory collaborators.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use storeloom::credits::{Balances, CreditGate, GateError, MemoryBalanceStore};
use storeloom::db::{RepositoryError, StoreRecords};
use storeloom::generation::{CompletionRequest, ContentGenerator, GeneratedMedia, GenerationError};
use storeloom::models::{NewStore, StoreRecord};
use storeloom::services::{StoreGenerationError, StoreGenerationService};
use storeloom::signal::{GenerationSignal, SignalHub};
use storeloom::wizard::{ImportMethod, ProductDraft, StoreGenerationRequest, ValidationError};
use storeloom_core::{AccountId, Credits, StoreId};
use storeloom_integration_tests::{FakeGenerator, MemoryStores, RecordingStorage, TestApp};
use tokio::sync::Barrier;
use url::Url;

fn request() -> StoreGenerationRequest {
    let mut with_photo = ProductDraft::new("Linen Apron", Some(Decimal::new(3200, 2)));
    with_photo
        .images
        .push(Url::parse("https://cdn.test/apron.png").unwrap());

    StoreGenerationRequest {
        import: ImportMethod::ProductType {
            product_type: "kitchen textiles".into(),
        },
        name: "  Warp & Weft ".into(),
        logo_url: None,
        products: vec![
            ProductDraft::new("Tea Towel", Some(Decimal::new(1450, 2))),
            with_photo,
            ProductDraft::new("Napkin Set", Some(Decimal::new(2800, 2))),
        ],
        collections: Vec::new(),
        style_prompt: "warm, hand-made".into(),
    }
}

#[tokio::test]
async fn test_generation_reports_progress_and_charges_once() {
    let app = TestApp::new();
    let account = AccountId::new("weaver");
    let service = app.state.store_generation();

    let seen: Arc<Mutex<Vec<Option<(u8, String)>>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let _subscription = service.progress().subscribe(
        account.clone(),
        move |signal: Option<&GenerationSignal>| {
            sink.lock()
                .unwrap()
                .push(signal.map(|s| (s.percent, s.status.clone())));
        },
    );

    let store = service.generate(&account, request()).await.unwrap();

    assert_eq!(store.name, "Warp & Weft");
    assert_eq!(store.owner, account);
    assert_eq!(store.products.len(), 3);
    assert!(store.products.iter().all(|p| !p.images.is_empty()));
    assert_eq!(
        store.products[1].images,
        vec![Url::parse("https://cdn.test/apron.png").unwrap()]
    );
    assert!(store.theme.landing_page_html.is_some());
    assert_eq!(store.theme.style_prompt, "warm, hand-made");

    // Only the two products without photos get generated images.
    assert_eq!(app.generator.image_calls(), 2);
    assert_eq!(app.balance("weaver"), Some(75));
    assert_eq!(app.stores.all().len(), 1);

    let seen = seen.lock().unwrap().clone();
    let percents: Vec<Option<u8>> = seen.iter().map(|s| s.as_ref().map(|(p, _)| *p)).collect();
    assert_eq!(
        percents,
        vec![
            Some(5),
            Some(15),
            Some(35),
            Some(57),
            Some(90),
            Some(100),
            None
        ]
    );
    assert_eq!(
        seen[3].as_ref().map(|(_, status)| status.as_str()),
        Some("Creating product images (2/2)")
    );
    assert!(service.progress().current(&account).is_none());
}

#[tokio::test]
async fn test_failed_generation_charges_nothing_and_clears_progress() {
    let app = TestApp::with_generator(FakeGenerator::failing_images());
    let account = AccountId::new("weaver");

    let err = app
        .state
        .store_generation()
        .generate(&account, request())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GateError::Action(StoreGenerationError::Generation(_))
    ));
    assert_eq!(app.balance("weaver"), Some(100));
    assert!(app.stores.all().is_empty());
    assert!(
        app.state
            .store_generation()
            .progress()
            .current(&account)
            .is_none()
    );
}

#[tokio::test]
async fn test_insufficient_credits_never_reach_the_generator() {
    let app = TestApp::new();
    app.set_balance("weaver", 24).await;

    let err = app
        .state
        .store_generation()
        .generate(&AccountId::new("weaver"), request())
        .await
        .unwrap_err();

    assert!(err.is_insufficient());
    assert_eq!(app.generator.calls(), 0);
    assert_eq!(app.balance("weaver"), Some(24));
}

#[tokio::test]
async fn test_invalid_payload_is_rejected_before_credit_check() {
    let app = TestApp::new();
    app.set_balance("weaver", 0).await;
    let mut payload = request();
    payload.products[0].price = Some(Decimal::ZERO);

    let err = app
        .state
        .store_generation()
        .generate(&AccountId::new("weaver"), payload)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GateError::Action(StoreGenerationError::Validation(
            ValidationError::ProductInvalidPrice { index: 0 }
        ))
    ));
    assert_eq!(app.generator.calls(), 0);
}

/// Holds every page generation until `parties` runs have reached it.
struct PagesAfterBarrier {
    inner: FakeGenerator,
    barrier: Barrier,
}

#[async_trait]
impl ContentGenerator for PagesAfterBarrier {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        self.inner.complete(request).await
    }

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedMedia, GenerationError> {
        self.inner.generate_image(prompt).await
    }

    async fn edit_image(&self, source: &Url, prompt: &str) -> Result<GeneratedMedia, GenerationError> {
        self.inner.edit_image(source, prompt).await
    }

    async fn generate_page(&self, prompt: &str) -> Result<String, GenerationError> {
        self.barrier.wait().await;
        self.inner.generate_page(prompt).await
    }

    async fn generate_video(
        &self,
        source: &Url,
        prompt: &str,
    ) -> Result<GeneratedMedia, GenerationError> {
        self.inner.generate_video(source, prompt).await
    }
}

/// Store records that refuse every write.
struct ReadOnlyStores;

#[async_trait]
impl StoreRecords for ReadOnlyStores {
    async fn create(&self, _store: NewStore) -> Result<StoreRecord, RepositoryError> {
        Err(RepositoryError::Conflict("read-only replica".into()))
    }

    async fn get(&self, _id: &StoreId) -> Result<Option<StoreRecord>, RepositoryError> {
        Ok(None)
    }

    async fn list_for_owner(&self, _owner: &AccountId) -> Result<Vec<StoreRecord>, RepositoryError> {
        Ok(Vec::new())
    }
}

fn service_over(
    balances: &MemoryBalanceStore,
    generator: Arc<dyn ContentGenerator>,
    stores: Arc<dyn StoreRecords>,
) -> StoreGenerationService {
    StoreGenerationService::new(
        CreditGate::new(Balances::new(Arc::new(balances.clone()))),
        generator,
        Arc::new(RecordingStorage::default()),
        stores,
        SignalHub::new(),
    )
}

#[tokio::test]
async fn test_racing_generations_save_only_the_charged_store() {
    let account = AccountId::new("weaver");
    let balances = MemoryBalanceStore::with_balance(account.clone(), Credits::new(30));
    let stores = Arc::new(MemoryStores::default());
    let service = service_over(
        &balances,
        Arc::new(PagesAfterBarrier {
            inner: FakeGenerator::new(),
            barrier: Barrier::new(2),
        }),
        Arc::clone(&stores) as Arc<dyn StoreRecords>,
    );

    // Both runs pass the balance check before either is charged.
    let (first, second) = tokio::join!(
        service.generate(&account, request()),
        service.generate(&account, request()),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| r.as_ref().is_err_and(GateError::is_insufficient))
    );
    assert_eq!(balances.peek(&account), Some(Credits::new(5)));
    assert_eq!(stores.all().len(), 1);
}

#[tokio::test]
async fn test_failed_save_is_refunded() {
    let account = AccountId::new("weaver");
    let balances = MemoryBalanceStore::with_balance(account.clone(), Credits::new(40));
    let service = service_over(
        &balances,
        Arc::new(FakeGenerator::new()),
        Arc::new(ReadOnlyStores),
    );

    let err = service.generate(&account, request()).await.unwrap_err();

    assert!(matches!(
        err,
        GateError::Action(StoreGenerationError::Repository(RepositoryError::Conflict(_)))
    ));
    assert_eq!(balances.peek(&account), Some(Credits::new(40)));
    assert!(service.progress().current(&account).is_none());
}
