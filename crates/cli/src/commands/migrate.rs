//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! storeloom-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! Migrations live in `crates/platform/migrations/` and are embedded at
//! compile time.

use thiserror::Error;

use super::ConnectError;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run platform database migrations.
pub async fn run() -> Result<(), MigrationError> {
    let pool = super::connect().await?;

    tracing::info!("Running platform migrations...");
    sqlx::migrate!("../platform/migrations").run(&pool).await?;

    tracing::info!("Platform migrations complete");
    Ok(())
}
