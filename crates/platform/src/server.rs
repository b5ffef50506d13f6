//! Router assembly.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    http::StatusCode,
    middleware::from_fn,
    response::{IntoResponse, Response},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::request_id_middleware;
use crate::routes;
use crate::state::AppState;

/// Full-page error served when the server cannot start normally.
#[derive(Debug, Clone, Template, WebTemplate)]
#[template(path = "bootstrap_error.html")]
pub struct BootstrapErrorTemplate {
    pub message: String,
}

/// The platform application with its request tracing layers.
pub fn app(state: AppState) -> Router {
    routes::routes()
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri().path(),
                        request_id = tracing::field::Empty,
                        account = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// An application answering every route with the bootstrap error page.
pub fn bootstrap_error_app(message: impl Into<String>) -> Router {
    let page = BootstrapErrorTemplate {
        message: message.into(),
    };
    Router::new().fallback(move || {
        let page = page.clone();
        async move { bootstrap_error_response(page) }
    })
}

fn bootstrap_error_response(page: BootstrapErrorTemplate) -> Response {
    match page.render() {
        Ok(html) => (
            StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Html(html),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render bootstrap error page");
            (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable").into_response()
        }
    }
}
