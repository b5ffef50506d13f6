//! Database operations for the platform `PostgreSQL` schema.
//!
//! ## Tables
//!
//! - `account_balances` - Per-account credit counter
//! - `stores` - Generated stores (products, collections and theme as JSONB)
//! - `billing_events` - Webhook events already applied
//!
//! # Migrations
//!
//! Migrations are stored in `crates/platform/migrations/` and run via:
//! ```bash
//! cargo run -p storeloom-cli -- migrate
//! ```

pub mod balances;
pub mod billing_events;
pub mod stores;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use balances::PgBalanceStore;
pub use billing_events::PgEventLedger;
pub use stores::{PgStoreRepository, StoreRecords};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate store ID).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
