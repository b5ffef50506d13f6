//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! POST /auth/sign-in                    - Email/password sign-in
//!
//! # API (bearer token required)
//! GET  /api/me                          - Signed-in account
//! GET  /api/credits                     - Balance (initialized at 100)
//! POST /api/assist                      - Credit-gated AI assist
//! GET  /api/stores                      - Stores owned by the account
//! POST /api/stores                      - Credit-gated store generation
//! GET  /api/stores/{id}                 - One owned store
//! GET  /api/generation/progress         - Progress banner fragment, 204 when idle
//!
//! # Billing
//! POST /api/billing/checkout            - Subscription checkout URL
//! POST /api/billing/connect             - Connected-account onboarding URL
//! POST /api/billing/portal              - Billing portal URL
//! POST /api/billing/product-checkout    - Checkout URL for a store's product
//! POST /api/billing/webhook             - Signed webhook (no bearer token)
//!
//! # Feed
//! POST /api/feed/posts                  - Create a post
//! GET  /api/feed/posts/{id}             - Post with its comments
//! POST /api/feed/posts/{id}/upvote      - Toggle upvote
//! POST /api/feed/posts/{id}/comments    - Add a comment
//! GET  /api/notifications               - Inbox and unread count
//! POST /api/notifications/read          - Mark all read
//! ```

pub mod assist;
pub mod auth;
pub mod billing;
pub mod credits;
pub mod feed;
pub mod health;
pub mod progress;
pub mod stores;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the billing routes router.
pub fn billing_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(billing::checkout))
        .route("/connect", post(billing::connect))
        .route("/portal", post(billing::portal))
        .route("/product-checkout", post(billing::product_checkout))
        .route("/webhook", post(billing::webhook))
}

/// Create the feed routes router.
pub fn feed_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", post(feed::create_post))
        .route("/posts/{id}", get(feed::show_post))
        .route("/posts/{id}/upvote", post(feed::toggle_upvote))
        .route("/posts/{id}/comments", post(feed::add_comment))
}

/// Create the API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(auth::me))
        .route("/credits", get(credits::show))
        .route("/assist", post(assist::run))
        .route("/stores", get(stores::index).post(stores::create))
        .route("/stores/{id}", get(stores::show))
        .route("/generation/progress", get(progress::banner))
        .nest("/billing", billing_routes())
        .nest("/feed", feed_routes())
        .route("/notifications", get(feed::notifications))
        .route("/notifications/read", post(feed::mark_read))
}

/// Create all routes for the platform.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/auth/sign-in", post(auth::sign_in))
        .nest("/api", api_routes())
}
