//! HTTP middleware for the platform API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (recorded on the span and the Sentry scope)
//!
//! Authentication is an extractor rather than a layer: handlers that need an
//! account take [`RequireAccount`].

pub mod auth;
pub mod request_id;

pub use auth::{RequireAccount, bearer_token};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
