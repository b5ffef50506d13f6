//! `PostgreSQL` balance store.
//!
//! The conditional decrement is a single `UPDATE ... WHERE credits >= $2`;
//! the row lock taken by the update serializes concurrent debits, and the
//! `credits >= 0` check constraint backs it up at the schema level.

use async_trait::async_trait;
use sqlx::PgPool;
use storeloom_core::{AccountId, Credits, DEFAULT_CREDITS};
use tracing::instrument;

use super::RepositoryError;
use crate::credits::{BalanceStore, CreditError};

/// Balance store backed by the `account_balances` table.
#[derive(Debug, Clone)]
pub struct PgBalanceStore {
    pool: PgPool,
}

impl PgBalanceStore {
    /// Create a new balance store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current(&self, account: &AccountId) -> Result<Option<Credits>, RepositoryError> {
        let credits: Option<i64> =
            sqlx::query_scalar("SELECT credits FROM account_balances WHERE account_id = $1")
                .bind(account)
                .fetch_optional(&self.pool)
                .await?;

        Ok(credits.map(Credits::new))
    }
}

#[async_trait]
impl BalanceStore for PgBalanceStore {
    #[instrument(skip_all, fields(account = %account))]
    async fn get_or_init(&self, account: &AccountId) -> Result<Credits, CreditError> {
        let inserted: Option<i64> = sqlx::query_scalar(
            r"
            INSERT INTO account_balances (account_id, credits)
            VALUES ($1, $2)
            ON CONFLICT (account_id) DO NOTHING
            RETURNING credits
            ",
        )
        .bind(account)
        .bind(DEFAULT_CREDITS.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        if let Some(credits) = inserted {
            tracing::info!("Initialized balance record");
            return Ok(Credits::new(credits));
        }

        self.current(account)
            .await?
            .ok_or_else(|| RepositoryError::DataCorruption(format!(
                "balance record for {account} vanished after insert conflict"
            )))
            .map_err(CreditError::from)
    }

    #[instrument(skip_all, fields(account = %account, amount = %amount))]
    async fn try_debit(
        &self,
        account: &AccountId,
        amount: Credits,
    ) -> Result<Credits, CreditError> {
        // Debiting an account that was never read still starts from the default.
        self.get_or_init(account).await?;

        let remaining: Option<i64> = sqlx::query_scalar(
            r"
            UPDATE account_balances
            SET credits = credits - $2, updated_at = NOW()
            WHERE account_id = $1 AND credits >= $2
            RETURNING credits
            ",
        )
        .bind(account)
        .bind(amount.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        match remaining {
            Some(credits) => Ok(Credits::new(credits)),
            None => Err(CreditError::Insufficient {
                required: amount,
                available: self.current(account).await?.unwrap_or(Credits::ZERO),
            }),
        }
    }

    #[instrument(skip_all, fields(account = %account, amount = %amount))]
    async fn grant(&self, account: &AccountId, amount: Credits) -> Result<Credits, CreditError> {
        let credits: i64 = sqlx::query_scalar(
            r"
            INSERT INTO account_balances (account_id, credits)
            VALUES ($1, $2 + $3)
            ON CONFLICT (account_id)
            DO UPDATE SET credits = account_balances.credits + $3, updated_at = NOW()
            RETURNING credits
            ",
        )
        .bind(account)
        .bind(DEFAULT_CREDITS.get())
        .bind(amount.get())
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(Credits::new(credits))
    }
}
