//! Unified error handling with Sentry integration.
//!
//! Every failure is classified onto the surface the user sees it on:
//!
//! | Failure               | Surface       | HTTP |
//! |-----------------------|---------------|------|
//! | validation            | inline        | 422  |
//! | authentication        | inline        | 401  |
//! | insufficient credits  | upsell dialog | 402  |
//! | external service      | toast         | 502  |
//! | internal              | toast         | 500  |
//!
//! Route handlers return `Result<T, AppError>`; the response body is a JSON
//! [`Notice`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use storeloom_core::{NoticeKind, Surface};
use thiserror::Error;

use crate::billing::BillingError;
use crate::credits::{CreditError, GateError};
use crate::db::RepositoryError;
use crate::feed::FeedError;
use crate::generation::GenerationError;
use crate::identity::AuthError;
use crate::services::{AssistError, StoreGenerationError};
use crate::storage::StorageError;
use crate::wizard::ValidationError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Balance check or debit failed.
    #[error("{0}")]
    Credits(#[from] CreditError),

    /// Generation API failed.
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Media storage failed.
    #[error("Upload failed: {0}")]
    Storage(#[from] StorageError),

    /// Billing failed.
    #[error("Billing error: {0}")]
    Billing(#[from] BillingError),

    /// Authentication failed.
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Form input is invalid.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Feed operation failed.
    #[error("{0}")]
    Feed(#[from] FeedError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AssistError> for AppError {
    fn from(err: AssistError) -> Self {
        match err {
            AssistError::Generation(e) => Self::Generation(e),
            AssistError::Storage(e) => Self::Storage(e),
        }
    }
}

impl From<StoreGenerationError> for AppError {
    fn from(err: StoreGenerationError) -> Self {
        match err {
            StoreGenerationError::Validation(e) => Self::Validation(e),
            StoreGenerationError::Generation(e) => Self::Generation(e),
            StoreGenerationError::Storage(e) => Self::Storage(e),
            StoreGenerationError::Repository(e) => Self::Database(e),
        }
    }
}

impl<E: Into<Self>> From<GateError<E>> for AppError {
    fn from(err: GateError<E>) -> Self {
        match err {
            GateError::Credits(e) => Self::Credits(e),
            GateError::Action(e) => e.into(),
        }
    }
}

/// A user-facing notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub surface: Surface,
    pub kind: NoticeKind,
    pub message: String,
    /// Offending form field, for inline notices.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Credits(CreditError::Insufficient { .. }) => StatusCode::PAYMENT_REQUIRED,
            Self::Credits(CreditError::InvalidAmount(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Validation(_) | Self::Feed(FeedError::EmptyPost | FeedError::EmptyComment) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Auth(e) if e.is_client_error() => match e {
                AuthError::InvalidForm(_) => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::UNAUTHORIZED,
            },
            Self::Billing(e) if e.is_rejected_webhook() => StatusCode::BAD_REQUEST,
            Self::Billing(BillingError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Generation(_)
            | Self::Storage(_)
            | Self::Auth(_)
            | Self::Billing(BillingError::Http(_) | BillingError::Function { .. }) => {
                StatusCode::BAD_GATEWAY
            }
            Self::NotFound(_) | Self::Feed(FeedError::PostNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Credits(CreditError::Repository(_)) | Self::Billing(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Where the user sees this error.
    #[must_use]
    pub fn surface(&self) -> Surface {
        match self {
            Self::Credits(CreditError::Insufficient { .. }) => Surface::UpsellDialog,
            Self::Validation(_) | Self::Feed(FeedError::EmptyPost | FeedError::EmptyComment) => {
                Surface::Inline
            }
            Self::Auth(e) if e.is_client_error() => Surface::Inline,
            _ => Surface::Toast,
        }
    }

    /// The notice shown to the user.
    ///
    /// Internal details are replaced with a generic message.
    #[must_use]
    pub fn notice(&self) -> Notice {
        let message = match self {
            Self::Database(_)
            | Self::Internal(_)
            | Self::Credits(CreditError::Repository(_)) => {
                "Something went wrong. Please try again.".to_string()
            }
            Self::Credits(CreditError::Insufficient { required, available }) => format!(
                "This needs {required} credits and you have {available}. Buy more credits to continue."
            ),
            Self::Billing(e) if !e.is_rejected_webhook() => {
                "Billing is unavailable right now. Please try again.".to_string()
            }
            _ => self.to_string(),
        };

        let field = match self {
            Self::Validation(e) => Some(e.field()),
            Self::Auth(AuthError::InvalidForm(_) | AuthError::InvalidCredential) => {
                Some("credentials")
            }
            _ => None,
        };

        let kind = match self.surface() {
            Surface::UpsellDialog => NoticeKind::Warning,
            Surface::Inline | Surface::Toast => NoticeKind::Error,
        };

        Notice {
            surface: self.surface(),
            kind,
            message,
            field,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(self.notice())).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the signed-in account.
pub fn set_sentry_user(account: &storeloom_core::AccountId, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(account.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use storeloom_core::Credits;

    use super::*;

    fn insufficient() -> AppError {
        AppError::Credits(CreditError::Insufficient {
            required: Credits::new(25),
            available: Credits::new(5),
        })
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(insufficient().status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(
            AppError::Validation(ValidationError::MissingStoreName).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Auth(AuthError::InvalidToken).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Auth(AuthError::Provider("INTERNAL".into())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Generation(GenerationError::RateLimited(5)).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Billing(BillingError::StaleSignature).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_surfaces() {
        assert_eq!(insufficient().surface(), Surface::UpsellDialog);
        assert_eq!(
            AppError::Validation(ValidationError::NoProducts).surface(),
            Surface::Inline
        );
        assert_eq!(
            AppError::Auth(AuthError::PopupCancelled).surface(),
            Surface::Inline
        );
        assert_eq!(
            AppError::Generation(GenerationError::EmptyResult("image")).surface(),
            Surface::Toast
        );
    }

    #[test]
    fn test_notice_hides_internal_details() {
        let notice = AppError::Internal("connection string leaked".into()).notice();
        assert_eq!(notice.message, "Something went wrong. Please try again.");
        assert_eq!(notice.surface, Surface::Toast);
    }

    #[test]
    fn test_notice_for_validation_names_field() {
        let notice = AppError::Validation(ValidationError::MissingProductType).notice();
        assert_eq!(notice.field, Some("product_type"));
        assert_eq!(notice.message, "Enter a product type");
        assert_eq!(notice.kind, NoticeKind::Error);
    }

    #[test]
    fn test_gate_error_conversion() {
        let err: AppError = GateError::<AssistError>::Action(AssistError::Generation(
            GenerationError::Unauthorized("bad key".into()),
        ))
        .into();
        assert!(matches!(err, AppError::Generation(_)));

        let err: AppError = GateError::<AssistError>::Credits(CreditError::Insufficient {
            required: Credits::new(10),
            available: Credits::ZERO,
        })
        .into();
        assert_eq!(err.notice().surface, Surface::UpsellDialog);
    }

    #[test]
    fn test_into_response_status() {
        let response = insufficient().into_response();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }
}
