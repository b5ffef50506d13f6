//! Credit gate for AI-priced actions.
//!
//! The gate runs one priced action in three strictly ordered phases:
//!
//! 1. **Check** - read the balance; if it does not cover the action's cost the
//!    action is never started.
//! 2. **Act** - run the action.
//! 3. **Debit** - on success, charge the fixed cost with the store's atomic
//!    conditional decrement.
//!
//! A failed action is not charged. Nothing compensates work a managed
//! collaborator may already have billed externally, and the gate never
//! retries; callers re-invoke it.

use std::fmt::Display;
use std::future::Future;

use storeloom_core::{AccountId, PricedAction};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use super::{Balances, CreditError};

/// Failure of a gated action.
#[derive(Debug, Error)]
pub enum GateError<E> {
    /// The balance check or the final debit failed.
    #[error(transparent)]
    Credits(#[from] CreditError),

    /// The wrapped action failed; nothing was debited.
    #[error("{0}")]
    Action(E),
}

impl<E> GateError<E> {
    /// Whether the failure is an insufficient balance.
    #[must_use]
    pub const fn is_insufficient(&self) -> bool {
        matches!(self, Self::Credits(CreditError::Insufficient { .. }))
    }
}

/// Wraps priced actions in the check → act → debit protocol.
#[derive(Clone, Debug)]
pub struct CreditGate {
    balances: Balances,
}

impl CreditGate {
    /// Create a gate charging against `balances`.
    #[must_use]
    pub const fn new(balances: Balances) -> Self {
        Self { balances }
    }

    /// The balance service this gate charges.
    #[must_use]
    pub const fn balances(&self) -> &Balances {
        &self.balances
    }

    /// Run `action` if `account` can afford `priced`, charging its cost on success.
    ///
    /// `action` is only invoked after the balance check passes.
    ///
    /// If the debit is rejected because a concurrent action spent the balance
    /// in the meantime, the action's output is dropped and
    /// [`CreditError::Insufficient`] is returned.
    ///
    /// # Errors
    ///
    /// - [`GateError::Credits`] with [`CreditError::Insufficient`] when the
    ///   balance does not cover the cost (before or after the action)
    /// - [`GateError::Action`] when the action itself fails
    #[instrument(skip_all, fields(account = %account, action = %priced, cost = %priced.cost()))]
    pub async fn run<T, E, F, Fut>(
        &self,
        account: &AccountId,
        priced: PricedAction,
        action: F,
    ) -> Result<T, GateError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let cost = priced.cost();

        let available = self.balances.get_balance(account).await?;
        if !available.covers(cost) {
            info!(available = %available, "Blocked priced action: insufficient credits");
            return Err(GateError::Credits(CreditError::Insufficient {
                required: cost,
                available,
            }));
        }

        let output = match action().await {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "Priced action failed; nothing debited");
                return Err(GateError::Action(e));
            }
        };

        match self.balances.debit(account, cost).await {
            Ok(remaining) => {
                info!(remaining = %remaining, "Priced action charged");
                Ok(output)
            }
            Err(e) => {
                error!(
                    error = %e,
                    "Priced action completed but debit was rejected; external work is unreconciled"
                );
                Err(GateError::Credits(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use storeloom_core::Credits;

    use super::*;
    use crate::credits::MemoryBalanceStore;

    fn account() -> AccountId {
        AccountId::new("acct-gate")
    }

    fn gate_with(credits: i64) -> (CreditGate, MemoryBalanceStore) {
        let store = MemoryBalanceStore::with_balance(account(), Credits::new(credits));
        let gate = CreditGate::new(Balances::new(Arc::new(store.clone())));
        (gate, store)
    }

    #[tokio::test]
    async fn test_success_debits_fixed_cost() {
        let (gate, store) = gate_with(30);

        let result: Result<&str, GateError<String>> = gate
            .run(&account(), PricedAction::StoreGeneration, || async { Ok("done") })
            .await;

        assert_eq!(result.expect("gated"), "done");
        assert_eq!(store.peek(&account()), Some(Credits::new(5)));
    }

    #[tokio::test]
    async fn test_insufficient_never_runs_action() {
        let (gate, store) = gate_with(5);
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let result: Result<(), GateError<String>> = gate
            .run(&account(), PricedAction::StoreGeneration, || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(result.expect_err("blocked").is_insufficient());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.peek(&account()), Some(Credits::new(5)));
    }

    #[tokio::test]
    async fn test_failed_action_is_not_charged() {
        let (gate, store) = gate_with(30);

        let result: Result<(), GateError<String>> = gate
            .run(&account(), PricedAction::Logo, || async {
                Err("upstream exploded".to_string())
            })
            .await;

        assert!(matches!(result, Err(GateError::Action(ref msg)) if msg == "upstream exploded"));
        assert_eq!(store.peek(&account()), Some(Credits::new(30)));
    }

    #[tokio::test]
    async fn test_debit_rejected_after_balance_spent_elsewhere() {
        let (gate, store) = gate_with(10);
        let spender = gate.balances().clone();

        let result: Result<&str, GateError<String>> = gate
            .run(&account(), PricedAction::Products, || async move {
                // Another tab spends the balance while the action is in flight.
                spender
                    .debit(&account(), Credits::new(10))
                    .await
                    .map_err(|e| e.to_string())?;
                Ok("products")
            })
            .await;

        assert!(result.expect_err("debit rejected").is_insufficient());
        assert_eq!(store.peek(&account()), Some(Credits::ZERO));
    }
}
