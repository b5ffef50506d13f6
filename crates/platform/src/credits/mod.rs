//! Per-account credit balances.
//!
//! # Model
//!
//! Every account owns a single integer counter. The counter is created at
//! [`DEFAULT_CREDITS`] the first time it is read and afterwards only changes
//! through two atomic operations:
//!
//! - [`BalanceStore::grant`] - unconditional increment (purchases, manual grants)
//! - [`BalanceStore::try_debit`] - conditional decrement that fails instead of
//!   letting the balance go negative
//!
//! There is no "set balance" operation and no separate check-then-write
//! path. Two concurrent debits can never overspend.
//!
//! # Implementations
//!
//! - [`crate::db::balances::PgBalanceStore`] - `PostgreSQL`, conditional `UPDATE`
//! - [`MemoryBalanceStore`] - mutex-guarded map for local runs and tests

pub mod gate;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use storeloom_core::{AccountId, Credits, CreditsError, DEFAULT_CREDITS};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::db::RepositoryError;

pub use gate::{CreditGate, GateError};

/// Errors raised by balance operations.
#[derive(Debug, Error)]
pub enum CreditError {
    /// The balance does not cover the requested amount.
    #[error("insufficient credits: {required} required, {available} available")]
    Insufficient {
        /// Amount that was requested.
        required: Credits,
        /// Balance at the time of the check.
        available: Credits,
    },

    /// Debits and grants must be strictly positive.
    #[error("invalid credit amount: {0}")]
    InvalidAmount(#[from] CreditsError),

    /// The backing store failed.
    #[error("balance store error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Persistence for per-account balances.
///
/// Implementations must make [`try_debit`](Self::try_debit) a single atomic
/// conditional operation.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Read the balance, creating the record at [`DEFAULT_CREDITS`] if absent.
    async fn get_or_init(&self, account: &AccountId) -> Result<Credits, CreditError>;

    /// Subtract `amount` if and only if the balance covers it.
    ///
    /// Returns the new balance, or [`CreditError::Insufficient`] with the
    /// balance observed by the failed update.
    async fn try_debit(&self, account: &AccountId, amount: Credits)
    -> Result<Credits, CreditError>;

    /// Add `amount`, creating the record first if needed. Returns the new balance.
    async fn grant(&self, account: &AccountId, amount: Credits) -> Result<Credits, CreditError>;
}

/// Balance operations exposed to the rest of the platform.
///
/// Cheap to clone; wraps a shared [`BalanceStore`].
#[derive(Clone)]
pub struct Balances {
    store: Arc<dyn BalanceStore>,
}

impl Balances {
    /// Create a balance service over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn BalanceStore>) -> Self {
        Self { store }
    }

    /// Current credits for `account`, initializing the record if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[instrument(skip_all, fields(account = %account))]
    pub async fn get_balance(&self, account: &AccountId) -> Result<Credits, CreditError> {
        self.store.get_or_init(account).await
    }

    /// Whether `account` currently holds at least `amount` credits.
    ///
    /// A pure read: a `true` answer is not a reservation.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn can_afford(
        &self,
        account: &AccountId,
        amount: Credits,
    ) -> Result<bool, CreditError> {
        Ok(self.get_balance(account).await?.covers(amount))
    }

    /// Atomically debit `amount`.
    ///
    /// # Errors
    ///
    /// Returns [`CreditError::Insufficient`] if the balance does not cover the
    /// amount at the moment of the update, or [`CreditError::InvalidAmount`]
    /// for non-positive amounts.
    #[instrument(skip_all, fields(account = %account, amount = %amount))]
    pub async fn debit(&self, account: &AccountId, amount: Credits) -> Result<Credits, CreditError> {
        let amount = Credits::positive(amount.get())?;
        let remaining = self.store.try_debit(account, amount).await?;
        debug!(remaining = %remaining, "Debited credits");
        Ok(remaining)
    }

    /// Atomically add `amount`.
    ///
    /// # Errors
    ///
    /// Returns [`CreditError::InvalidAmount`] for non-positive amounts or an
    /// error if the store fails.
    #[instrument(skip_all, fields(account = %account, amount = %amount))]
    pub async fn grant(&self, account: &AccountId, amount: Credits) -> Result<Credits, CreditError> {
        let amount = Credits::positive(amount.get())?;
        let balance = self.store.grant(account, amount).await?;
        debug!(balance = %balance, "Granted credits");
        Ok(balance)
    }
}

impl std::fmt::Debug for Balances {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Balances").finish_non_exhaustive()
    }
}

/// In-memory balance store.
///
/// Every operation holds the map lock for its whole read-modify-write, which
/// makes `try_debit` atomic with respect to other callers.
#[derive(Debug, Default, Clone)]
pub struct MemoryBalanceStore {
    balances: Arc<Mutex<HashMap<AccountId, Credits>>>,
}

impl MemoryBalanceStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with a preset balance for one account.
    #[must_use]
    pub fn with_balance(account: AccountId, credits: Credits) -> Self {
        let store = Self::new();
        store.lock().insert(account, credits);
        store
    }

    /// Peek at a balance without initializing it.
    #[must_use]
    pub fn peek(&self, account: &AccountId) -> Option<Credits> {
        self.lock().get(account).copied()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<AccountId, Credits>> {
        self.balances.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BalanceStore for MemoryBalanceStore {
    async fn get_or_init(&self, account: &AccountId) -> Result<Credits, CreditError> {
        Ok(*self
            .lock()
            .entry(account.clone())
            .or_insert(DEFAULT_CREDITS))
    }

    async fn try_debit(
        &self,
        account: &AccountId,
        amount: Credits,
    ) -> Result<Credits, CreditError> {
        let mut balances = self.lock();
        let balance = balances.entry(account.clone()).or_insert(DEFAULT_CREDITS);
        let remaining = balance
            .checked_debit(amount)
            .ok_or(CreditError::Insufficient {
                required: amount,
                available: *balance,
            })?;
        *balance = remaining;
        Ok(remaining)
    }

    async fn grant(&self, account: &AccountId, amount: Credits) -> Result<Credits, CreditError> {
        let mut balances = self.lock();
        let balance = balances.entry(account.clone()).or_insert(DEFAULT_CREDITS);
        *balance = balance.saturating_add(amount);
        Ok(*balance)
    }
}
