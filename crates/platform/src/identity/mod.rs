//! Identity: bearer-token verification and password sign-in.
//!
//! Accounts live with the identity provider; the platform only verifies
//! tokens and keys everything else by the provider's account ID.

pub mod client;
pub mod error;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use storeloom_core::AccountId;

pub use client::IdentityClient;
pub use error::AuthError;

/// The signed-in account behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSession {
    pub account_id: AccountId,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Result of a successful password sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedIn {
    /// Bearer token for subsequent requests.
    pub id_token: String,
    pub session: AccountSession,
}

/// Email/password sign-in form.
#[derive(Debug, Clone, Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

impl SignInForm {
    /// Check the form before contacting the provider.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidForm`] naming the first missing field.
    pub fn validate(&self) -> Result<(), AuthError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(AuthError::InvalidForm("Enter your email address"));
        }
        if !email.contains('@') {
            return Err(AuthError::InvalidForm("Enter a valid email address"));
        }
        if self.password.is_empty() {
            return Err(AuthError::InvalidForm("Enter your password"));
        }
        Ok(())
    }
}

/// Identity provider operations.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token to its account.
    async fn verify_token(&self, token: &str) -> Result<AccountSession, AuthError>;

    /// Sign in with email and password.
    async fn sign_in(&self, form: &SignInForm) -> Result<SignedIn, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(email: &str, password: &str) -> SignInForm {
        SignInForm {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_sign_in_form_validation() {
        assert!(form("ada@example.com", "hunter2").validate().is_ok());
        assert!(matches!(
            form("  ", "x").validate(),
            Err(AuthError::InvalidForm("Enter your email address"))
        ));
        assert!(matches!(
            form("ada", "x").validate(),
            Err(AuthError::InvalidForm("Enter a valid email address"))
        ));
        assert!(matches!(
            form("ada@example.com", "").validate(),
            Err(AuthError::InvalidForm("Enter your password"))
        ));
    }
}
