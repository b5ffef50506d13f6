//! Credit administration commands.
//!
//! # Usage
//!
//! ```bash
//! storeloom-cli credits show acct_123
//! storeloom-cli credits grant acct_123 50
//! ```
//!
//! Grants go through the same atomic increment as purchases.

use std::sync::Arc;

use storeloom::credits::{Balances, CreditError};
use storeloom::db::PgBalanceStore;
use storeloom_core::{AccountId, Credits};
use thiserror::Error;

use super::ConnectError;

/// Errors that can occur during credit administration.
#[derive(Debug, Error)]
pub enum CreditsCommandError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Invalid account ID: must not be empty")]
    EmptyAccount,

    #[error(transparent)]
    Credits(#[from] CreditError),
}

async fn balances() -> Result<Balances, CreditsCommandError> {
    let pool = super::connect().await?;
    Ok(Balances::new(Arc::new(PgBalanceStore::new(pool))))
}

fn account_id(raw: &str) -> Result<AccountId, CreditsCommandError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CreditsCommandError::EmptyAccount);
    }
    Ok(AccountId::new(raw))
}

/// Show an account's balance.
pub async fn show(account: &str) -> Result<(), CreditsCommandError> {
    let account = account_id(account)?;
    let credits = balances().await?.get_balance(&account).await?;
    tracing::info!(account = %account, credits = %credits, "Balance");
    Ok(())
}

/// Grant credits to an account.
pub async fn grant(account: &str, amount: i64) -> Result<(), CreditsCommandError> {
    let account = account_id(account)?;
    let amount = Credits::positive(amount).map_err(CreditError::from)?;
    let balance = balances().await?.grant(&account, amount).await?;
    tracing::info!(account = %account, granted = %amount, balance = %balance, "Granted credits");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_trims_and_rejects_empty() {
        assert_eq!(account_id("  acct_1 ").expect("valid").as_str(), "acct_1");
        assert!(matches!(
            account_id("   "),
            Err(CreditsCommandError::EmptyAccount)
        ));
    }
}
