//! Signed purchase webhook.
//!
//! The billing platform signs each delivery with
//! `Stripe-Signature: t=<unix>,v1=<hex hmac-sha256("{t}.{body}")>`.
//! Completed checkouts carrying `metadata.account_id` and `metadata.credits`
//! grant credits exactly once per event ID; every other event is
//! acknowledged and ignored.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use storeloom_core::{AccountId, Credits};
use tracing::{error, info, instrument, warn};

use super::BillingError;
use crate::credits::Balances;
use crate::db::RepositoryError;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Maximum age (and clock skew) accepted for a signed delivery, in seconds.
pub const TOLERANCE_SECS: i64 = 300;

const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Record of processed webhook events.
#[async_trait]
pub trait EventLedger: Send + Sync {
    /// Record `event_id`. Returns `false` if it was already recorded.
    async fn record(&self, event_id: &str) -> Result<bool, RepositoryError>;

    /// Remove `event_id` so a redelivery is processed again.
    async fn forget(&self, event_id: &str) -> Result<(), RepositoryError>;
}

/// In-memory event ledger.
#[derive(Debug, Default, Clone)]
pub struct MemoryEventLedger {
    seen: Arc<Mutex<HashSet<String>>>,
}

#[async_trait]
impl EventLedger for MemoryEventLedger {
    async fn record(&self, event_id: &str) -> Result<bool, RepositoryError> {
        Ok(self
            .seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(event_id.to_string()))
    }

    async fn forget(&self, event_id: &str) -> Result<(), RepositoryError> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(event_id);
        Ok(())
    }
}

/// What a webhook delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    /// Purchased credits were granted.
    CreditsGranted {
        event_id: String,
        account: AccountId,
        credits: Credits,
        balance: Credits,
    },
    /// The event was already processed.
    Duplicate { event_id: String },
    /// The event type is not handled.
    Ignored { event_id: String, event_type: String },
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: CheckoutSession,
}

#[derive(Debug, Default, Deserialize)]
struct CheckoutSession {
    #[serde(default)]
    metadata: PurchaseMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct PurchaseMetadata {
    account_id: Option<String>,
    credits: Option<String>,
}

/// Verify a `Stripe-Signature` header against `payload`.
///
/// At least one `v1` signature must match; comparison is constant-time.
///
/// # Errors
///
/// Returns [`BillingError::InvalidSignature`] for malformed headers or
/// mismatches and [`BillingError::StaleSignature`] when `t` is more than
/// [`TOLERANCE_SECS`] away from `now`.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &SecretString,
    now: i64,
) -> Result<(), BillingError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(BillingError::InvalidSignature("missing timestamp"))?;
    if signatures.is_empty() {
        return Err(BillingError::InvalidSignature("missing v1 signature"));
    }
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| BillingError::InvalidSignature("invalid timestamp"))?;
    if now.abs_diff(ts) > TOLERANCE_SECS.unsigned_abs() {
        return Err(BillingError::StaleSignature);
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|_| BillingError::InvalidSignature("unusable secret"))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.iter().any(|signature| {
        hex::decode(signature).is_ok_and(|bytes| mac.clone().verify_slice(&bytes).is_ok())
    });
    if !matched {
        return Err(BillingError::InvalidSignature("signature mismatch"));
    }
    Ok(())
}

/// Verifies deliveries and grants purchased credits.
#[derive(Clone)]
pub struct WebhookHandler {
    balances: Balances,
    ledger: Arc<dyn EventLedger>,
    secret: SecretString,
}

impl std::fmt::Debug for WebhookHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookHandler")
            .field("secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl WebhookHandler {
    /// Create a handler.
    #[must_use]
    pub fn new(balances: Balances, ledger: Arc<dyn EventLedger>, secret: SecretString) -> Self {
        Self {
            balances,
            ledger,
            secret,
        }
    }

    /// Verify and process one delivery received at unix time `now`.
    ///
    /// # Errors
    ///
    /// Returns a [rejection](BillingError::is_rejected_webhook) for bad
    /// signatures or payloads, or a server-side error if recording or
    /// granting fails.
    #[instrument(skip_all)]
    pub async fn handle(
        &self,
        payload: &[u8],
        signature: &str,
        now: i64,
    ) -> Result<WebhookEvent, BillingError> {
        verify_signature(payload, signature, &self.secret, now)?;

        let envelope: EventEnvelope = serde_json::from_slice(payload)
            .map_err(|e| BillingError::InvalidEvent(e.to_string()))?;

        if envelope.event_type != CHECKOUT_COMPLETED {
            info!(
                event_id = %envelope.id,
                event_type = %envelope.event_type,
                "Ignoring billing event"
            );
            return Ok(WebhookEvent::Ignored {
                event_id: envelope.id,
                event_type: envelope.event_type,
            });
        }

        let (account, credits) = purchase_of(&envelope.data.object.metadata)?;

        if !self.ledger.record(&envelope.id).await? {
            info!(event_id = %envelope.id, "Duplicate billing event");
            return Ok(WebhookEvent::Duplicate {
                event_id: envelope.id,
            });
        }

        let balance = match self.balances.grant(&account, credits).await {
            Ok(balance) => balance,
            Err(e) => {
                // Un-record so the platform's redelivery retries the grant.
                if let Err(forget_err) = self.ledger.forget(&envelope.id).await {
                    error!(
                        event_id = %envelope.id,
                        error = %forget_err,
                        "Grant failed and event could not be un-recorded; redelivery will be skipped"
                    );
                } else {
                    warn!(event_id = %envelope.id, error = %e, "Grant failed");
                }
                return Err(e.into());
            }
        };
        info!(
            event_id = %envelope.id,
            account = %account,
            credits = %credits,
            balance = %balance,
            "Granted purchased credits"
        );

        Ok(WebhookEvent::CreditsGranted {
            event_id: envelope.id,
            account,
            credits,
            balance,
        })
    }
}

fn purchase_of(metadata: &PurchaseMetadata) -> Result<(AccountId, Credits), BillingError> {
    let account = metadata
        .account_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| BillingError::InvalidEvent("missing metadata.account_id".to_string()))?;
    let credits = metadata
        .credits
        .as_deref()
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .ok_or_else(|| {
            BillingError::InvalidEvent("missing or invalid metadata.credits".to_string())
        })?;
    let credits =
        Credits::positive(credits).map_err(|e| BillingError::InvalidEvent(e.to_string()))?;
    Ok((AccountId::new(account), credits))
}
