//! Sign-in and current account.

use axum::{Json, extract::State};

use crate::error::Result;
use crate::identity::{AccountSession, SignInForm, SignedIn};
use crate::middleware::RequireAccount;
use crate::state::AppState;

/// Sign in with email and password.
///
/// POST /auth/sign-in
///
/// # Errors
///
/// Returns 422 for an incomplete form, 401 for wrong credentials and 502
/// when the identity provider fails.
#[tracing::instrument(skip_all)]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(form): Json<SignInForm>,
) -> Result<Json<SignedIn>> {
    form.validate()?;
    let signed_in = state.identity().sign_in(&form).await?;
    tracing::info!(account = %signed_in.session.account_id, "Signed in");
    Ok(Json(signed_in))
}

/// The signed-in account.
///
/// GET /api/me
pub async fn me(RequireAccount(session): RequireAccount) -> Json<AccountSession> {
    Json(session)
}
