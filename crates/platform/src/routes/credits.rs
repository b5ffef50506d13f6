//! Credit balance.

use axum::{Json, extract::State};
use serde::Serialize;
use storeloom_core::{AccountId, Credits};

use crate::error::Result;
use crate::middleware::RequireAccount;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub account_id: AccountId,
    pub credits: Credits,
}

/// Current balance, creating the record at the default if absent.
///
/// GET /api/credits
///
/// # Errors
///
/// Returns 500 if the balance store fails.
pub async fn show(
    State(state): State<AppState>,
    RequireAccount(session): RequireAccount,
) -> Result<Json<BalanceResponse>> {
    let credits = state.balances().get_balance(&session.account_id).await?;
    Ok(Json(BalanceResponse {
        account_id: session.account_id,
        credits,
    }))
}
