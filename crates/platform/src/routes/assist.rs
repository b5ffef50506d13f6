//! Credit-gated AI assists.

use axum::{Json, extract::State};

use crate::error::Result;
use crate::middleware::RequireAccount;
use crate::services::{AssistOutput, AssistRequest};
use crate::state::AppState;

/// Run one assist.
///
/// POST /api/assist
///
/// ```json
/// {"action": "products", "context": "handmade ceramics", "count": 4}
/// ```
///
/// # Errors
///
/// Returns 402 when the balance does not cover the price and 502 when
/// generation or upload fails. Nothing is charged on failure.
pub async fn run(
    State(state): State<AppState>,
    RequireAccount(session): RequireAccount,
    Json(request): Json<AssistRequest>,
) -> Result<Json<AssistOutput>> {
    let output = state
        .assistant()
        .run(&session.account_id, request)
        .await?;
    Ok(Json(output))
}
