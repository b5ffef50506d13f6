//! Authentication error types.

use thiserror::Error;

/// Errors that can occur during authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong email/password, unknown or disabled account.
    #[error("invalid email or password")]
    InvalidCredential,

    /// The user closed the federated sign-in popup.
    #[error("sign-in was cancelled")]
    PopupCancelled,

    /// The bearer token is expired, revoked or malformed.
    #[error("invalid or expired token")]
    InvalidToken,

    /// No bearer token was supplied.
    #[error("missing bearer token")]
    MissingToken,

    /// The sign-in form is incomplete.
    #[error("{0}")]
    InvalidForm(&'static str),

    /// Any other provider failure, with the provider's code.
    #[error("identity provider error: {0}")]
    Provider(String),

    /// HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The client is misconfigured.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Map a provider error code to an error.
    ///
    /// Codes may carry a detail suffix (`"TOO_MANY_ATTEMPTS : try later"`);
    /// only the leading code is matched.
    #[must_use]
    pub fn from_provider_code(code: &str) -> Self {
        let code = code
            .split([' ', ':'])
            .find(|part| !part.is_empty())
            .unwrap_or_default();
        match code {
            "INVALID_PASSWORD"
            | "EMAIL_NOT_FOUND"
            | "INVALID_LOGIN_CREDENTIALS"
            | "INVALID_EMAIL"
            | "USER_DISABLED"
            | "auth/wrong-password"
            | "auth/user-not-found"
            | "auth/invalid-credential" => Self::InvalidCredential,
            "POPUP_CLOSED_BY_USER"
            | "auth/popup-closed-by-user"
            | "auth/cancelled-popup-request" => Self::PopupCancelled,
            "INVALID_ID_TOKEN"
            | "TOKEN_EXPIRED"
            | "USER_NOT_FOUND"
            | "auth/id-token-expired"
            | "auth/id-token-revoked"
            | "auth/invalid-id-token" => Self::InvalidToken,
            other => Self::Provider(other.to_string()),
        }
    }

    /// Whether the failure lies with the user rather than the provider.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Provider(_) | Self::Http(_) | Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_provider_code() {
        assert!(matches!(
            AuthError::from_provider_code("INVALID_PASSWORD"),
            AuthError::InvalidCredential
        ));
        assert!(matches!(
            AuthError::from_provider_code("auth/popup-closed-by-user"),
            AuthError::PopupCancelled
        ));
        assert!(matches!(
            AuthError::from_provider_code("TOKEN_EXPIRED"),
            AuthError::InvalidToken
        ));
        assert!(matches!(
            AuthError::from_provider_code("TOO_MANY_ATTEMPTS_TRY_LATER : Access disabled"),
            AuthError::Provider(ref code) if code == "TOO_MANY_ATTEMPTS_TRY_LATER"
        ));
    }

    #[test]
    fn test_client_errors() {
        assert!(AuthError::InvalidCredential.is_client_error());
        assert!(AuthError::MissingToken.is_client_error());
        assert!(!AuthError::Provider("INTERNAL".to_string()).is_client_error());
    }
}
