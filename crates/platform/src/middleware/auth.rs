//! Bearer-token authentication extractor.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use tracing::Span;

use crate::error::{AppError, set_sentry_user};
use crate::identity::{AccountSession, AuthError};
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// The token is verified with the identity provider on every request.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAccount(session): RequireAccount) -> String {
///     session.account_id.to_string()
/// }
/// ```
pub struct RequireAccount(pub AccountSession);

impl FromRequestParts<AppState> for RequireAccount {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        let session = state.identity().verify_token(token).await?;

        Span::current().record("account", tracing::field::display(&session.account_id));
        set_sentry_user(&session.account_id, session.email.as_deref());

        Ok(Self(session))
    }
}

/// The token of an `Authorization: Bearer <token>` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
