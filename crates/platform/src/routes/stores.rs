//! Store generation and listing.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use storeloom_core::StoreId;

use crate::error::{AppError, Result};
use crate::middleware::RequireAccount;
use crate::models::StoreRecord;
use crate::state::AppState;
use crate::wizard::StoreGenerationRequest;

/// Generate a store from a submitted wizard payload.
///
/// POST /api/stores
///
/// Progress is published while the request runs and can be polled from
/// `GET /api/generation/progress`.
///
/// # Errors
///
/// Returns 422 for an invalid payload, 402 when the balance does not cover
/// store generation and 502 when generation or upload fails.
pub async fn create(
    State(state): State<AppState>,
    RequireAccount(session): RequireAccount,
    Json(request): Json<StoreGenerationRequest>,
) -> Result<(StatusCode, Json<StoreRecord>)> {
    let record = state
        .store_generation()
        .generate(&session.account_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Stores owned by the signed-in account, newest first.
///
/// GET /api/stores
///
/// # Errors
///
/// Returns 500 if the database query fails.
pub async fn index(
    State(state): State<AppState>,
    RequireAccount(session): RequireAccount,
) -> Result<Json<Vec<StoreRecord>>> {
    Ok(Json(state.stores().list_for_owner(&session.account_id).await?))
}

/// One store owned by the signed-in account.
///
/// GET /api/stores/{id}
///
/// # Errors
///
/// Returns 404 for unknown stores and stores owned by someone else.
pub async fn show(
    State(state): State<AppState>,
    RequireAccount(session): RequireAccount,
    Path(id): Path<String>,
) -> Result<Json<StoreRecord>> {
    let id = StoreId::new(id);
    state
        .stores()
        .get(&id)
        .await?
        .filter(|store| store.owner == session.account_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("store {id}")))
}
