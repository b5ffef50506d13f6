//! Error types for billing.

use thiserror::Error;

use crate::credits::CreditError;
use crate::db::RepositoryError;

/// Errors raised by billing functions and webhooks.
#[derive(Debug, Error)]
pub enum BillingError {
    /// HTTP request to the billing functions failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A billing function returned an error.
    #[error("billing function {function} failed: {message}")]
    Function {
        function: &'static str,
        message: String,
    },

    /// A response could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Billing is not configured on this server.
    #[error("billing is not configured")]
    NotConfigured,

    /// The webhook signature header is missing or malformed, or does not match.
    #[error("invalid webhook signature: {0}")]
    InvalidSignature(&'static str),

    /// The webhook timestamp is outside the tolerance window.
    #[error("webhook timestamp outside tolerance")]
    StaleSignature,

    /// The webhook payload is not a usable event.
    #[error("invalid webhook event: {0}")]
    InvalidEvent(String),

    /// Granting purchased credits failed.
    #[error("credit grant failed: {0}")]
    Credits(#[from] CreditError),

    /// Recording the processed event failed.
    #[error("event ledger error: {0}")]
    Ledger(#[from] RepositoryError),

    /// The client is misconfigured.
    #[error("configuration error: {0}")]
    Config(String),
}

impl BillingError {
    /// Whether the caller sent a bad webhook (as opposed to a server fault).
    #[must_use]
    pub const fn is_rejected_webhook(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature(_) | Self::StaleSignature | Self::InvalidEvent(_)
        )
    }
}
