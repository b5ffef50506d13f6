//! Billing redirects and the purchase webhook.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use serde::Serialize;
use url::Url;

use crate::billing::webhook::SIGNATURE_HEADER;
use crate::billing::{
    BillingError, BillingFunctions, CheckoutRequest, ProductCheckoutRequest, ReturnRequest,
    WebhookEvent,
};
use crate::error::Result;
use crate::middleware::RequireAccount;
use crate::state::AppState;

/// Where to send the user next.
#[derive(Debug, Serialize)]
pub struct RedirectResponse {
    pub url: Url,
}

/// Webhook acknowledgement.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub event_id: String,
    pub outcome: &'static str,
}

fn functions(state: &AppState) -> Result<&dyn BillingFunctions> {
    Ok(state.billing().ok_or(BillingError::NotConfigured)?)
}

/// Subscription or credit-pack checkout.
///
/// POST /api/billing/checkout
///
/// # Errors
///
/// Returns 503 when billing is not configured and 502 when the billing
/// function fails.
pub async fn checkout(
    State(state): State<AppState>,
    RequireAccount(session): RequireAccount,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<RedirectResponse>> {
    let url = functions(&state)?
        .create_checkout_session(&session.account_id, &request)
        .await?;
    Ok(Json(RedirectResponse { url }))
}

/// Connected-account onboarding.
///
/// POST /api/billing/connect
///
/// # Errors
///
/// Returns 503 when billing is not configured and 502 when the billing
/// function fails.
pub async fn connect(
    State(state): State<AppState>,
    RequireAccount(session): RequireAccount,
    Json(request): Json<ReturnRequest>,
) -> Result<Json<RedirectResponse>> {
    let url = functions(&state)?
        .create_connect_link(&session.account_id, &request)
        .await?;
    Ok(Json(RedirectResponse { url }))
}

/// Billing portal.
///
/// POST /api/billing/portal
///
/// # Errors
///
/// Returns 503 when billing is not configured and 502 when the billing
/// function fails.
pub async fn portal(
    State(state): State<AppState>,
    RequireAccount(session): RequireAccount,
    Json(request): Json<ReturnRequest>,
) -> Result<Json<RedirectResponse>> {
    let url = functions(&state)?
        .create_portal_session(&session.account_id, &request)
        .await?;
    Ok(Json(RedirectResponse { url }))
}

/// Checkout for a product of a generated store.
///
/// POST /api/billing/product-checkout
///
/// # Errors
///
/// Returns 503 when billing is not configured and 502 when the billing
/// function fails.
pub async fn product_checkout(
    State(state): State<AppState>,
    RequireAccount(session): RequireAccount,
    Json(request): Json<ProductCheckoutRequest>,
) -> Result<Json<RedirectResponse>> {
    let url = functions(&state)?
        .create_product_checkout(&session.account_id, &request)
        .await?;
    Ok(Json(RedirectResponse { url }))
}

/// Signed webhook from the billing platform.
///
/// POST /api/billing/webhook
///
/// Authenticated by its signature header, not a bearer token.
///
/// # Errors
///
/// Returns 400 for missing, stale or mismatched signatures and malformed
/// events, and 500 if the grant cannot be applied (the platform retries).
#[tracing::instrument(skip_all)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let handler = state.webhook().ok_or(BillingError::NotConfigured)?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(BillingError::InvalidSignature("missing signature header"))?;

    let event = handler
        .handle(&body, signature, chrono::Utc::now().timestamp())
        .await?;

    let ack = match event {
        WebhookEvent::CreditsGranted { event_id, .. } => WebhookAck {
            received: true,
            event_id,
            outcome: "credits_granted",
        },
        WebhookEvent::Duplicate { event_id } => WebhookAck {
            received: true,
            event_id,
            outcome: "duplicate",
        },
        WebhookEvent::Ignored { event_id, .. } => WebhookAck {
            received: true,
            event_id,
            outcome: "ignored",
        },
    };
    Ok(Json(ack))
}
