//! Processed billing webhook events.

use async_trait::async_trait;
use sqlx::PgPool;

use super::RepositoryError;
use crate::billing::EventLedger;

/// Event ledger backed by the `billing_events` table.
#[derive(Debug, Clone)]
pub struct PgEventLedger {
    pool: PgPool,
}

impl PgEventLedger {
    /// Create a new event ledger.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventLedger for PgEventLedger {
    async fn record(&self, event_id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO billing_events (event_id)
            VALUES ($1)
            ON CONFLICT (event_id) DO NOTHING
            ",
        )
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn forget(&self, event_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM billing_events WHERE event_id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
