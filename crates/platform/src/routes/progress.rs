//! Store generation progress banner.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::middleware::RequireAccount;
use crate::signal::ProgressBannerTemplate;
use crate::state::AppState;

/// Banner fragment for the account's running generation.
///
/// GET /api/generation/progress
///
/// Returns 204 when nothing is running.
pub async fn banner(
    State(state): State<AppState>,
    RequireAccount(session): RequireAccount,
) -> Response {
    state
        .progress()
        .current(&session.account_id)
        .as_ref()
        .and_then(ProgressBannerTemplate::for_signal)
        .map_or_else(|| StatusCode::NO_CONTENT.into_response(), IntoResponse::into_response)
}
