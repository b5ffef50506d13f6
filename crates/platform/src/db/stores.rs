//! Database operations for generated stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use storeloom_core::{AccountId, StoreId};
use tracing::instrument;
use url::Url;
use uuid::Uuid;

use super::RepositoryError;
use crate::models::{NewStore, StoreCollection, StoreProduct, StoreRecord, StoreTheme};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` store queries.
#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: String,
    owner_id: String,
    name: String,
    logo_url: Option<String>,
    products: Json<Vec<StoreProduct>>,
    collections: Json<Vec<StoreCollection>>,
    theme: Json<StoreTheme>,
    created_at: DateTime<Utc>,
}

impl TryFrom<StoreRow> for StoreRecord {
    type Error = RepositoryError;

    fn try_from(row: StoreRow) -> Result<Self, Self::Error> {
        let logo_url = row
            .logo_url
            .map(|raw| {
                Url::parse(&raw).map_err(|e| {
                    RepositoryError::DataCorruption(format!("invalid logo url {raw:?}: {e}"))
                })
            })
            .transpose()?;

        Ok(Self {
            id: StoreId::new(row.id),
            owner: AccountId::new(row.owner_id),
            name: row.name,
            logo_url,
            products: row.products.0,
            collections: row.collections.0,
            theme: row.theme.0,
            created_at: row.created_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Persistence for generated stores.
#[async_trait]
pub trait StoreRecords: Send + Sync {
    /// Insert a new store and return the stored record.
    async fn create(&self, store: NewStore) -> Result<StoreRecord, RepositoryError>;

    /// Fetch a store by ID.
    async fn get(&self, id: &StoreId) -> Result<Option<StoreRecord>, RepositoryError>;

    /// List an account's stores, newest first.
    async fn list_for_owner(&self, owner: &AccountId) -> Result<Vec<StoreRecord>, RepositoryError>;
}

/// Store repository backed by the `stores` table.
#[derive(Debug, Clone)]
pub struct PgStoreRepository {
    pool: PgPool,
}

impl PgStoreRepository {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoreRecords for PgStoreRepository {
    #[instrument(skip_all, fields(owner = %store.owner, name = %store.name))]
    async fn create(&self, store: NewStore) -> Result<StoreRecord, RepositoryError> {
        let id = Uuid::new_v4().to_string();

        let row: StoreRow = sqlx::query_as(
            r"
            INSERT INTO stores (id, owner_id, name, logo_url, products, collections, theme)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, owner_id, name, logo_url, products, collections, theme, created_at
            ",
        )
        .bind(&id)
        .bind(&store.owner)
        .bind(&store.name)
        .bind(store.logo_url.as_ref().map(Url::as_str))
        .bind(Json(&store.products))
        .bind(Json(&store.collections))
        .bind(Json(&store.theme))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!("store {id} already exists"))
            }
            other => RepositoryError::Database(other),
        })?;

        row.try_into()
    }

    async fn get(&self, id: &StoreId) -> Result<Option<StoreRecord>, RepositoryError> {
        let row: Option<StoreRow> = sqlx::query_as(
            r"
            SELECT id, owner_id, name, logo_url, products, collections, theme, created_at
            FROM stores
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_for_owner(&self, owner: &AccountId) -> Result<Vec<StoreRecord>, RepositoryError> {
        let rows: Vec<StoreRow> = sqlx::query_as(
            r"
            SELECT id, owner_id, name, logo_url, products, collections, theme, created_at
            FROM stores
            WHERE owner_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
