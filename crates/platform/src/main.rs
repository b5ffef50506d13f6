//! Storeloom platform server.
//!
//! # Architecture
//!
//! - Axum web framework, JSON API plus Askama HTML fragments
//! - `PostgreSQL` for balances, stores and processed billing events
//! - Generative content, object storage, identity and billing services over HTTP
//!
//! If configuration cannot be loaded the server still starts and answers
//! every route with a 503 error page naming the problem.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::Router;
use sentry::integrations::tracing as sentry_tracing;
use storeloom::config::{LogFormat, PlatformConfig};
use storeloom::db;
use storeloom::server;
use storeloom::state::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_PORT: u16 = 3000;

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &PlatformConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            send_default_pii: false,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "storeloom=info,tower_http=debug".into());

    let json_layer = (format == LogFormat::Json)
        .then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (format == LogFormat::Text).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

/// Log format before configuration is known.
fn env_log_format() -> LogFormat {
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => LogFormat::Json,
        _ => LogFormat::Text,
    }
}

/// Bind address for the bootstrap error page when configuration failed.
fn fallback_addr() -> SocketAddr {
    let host = std::env::var("STORELOOM_HOST")
        .ok()
        .and_then(|h| h.parse::<IpAddr>().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
    let port = std::env::var("STORELOOM_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    SocketAddr::new(host, port)
}

/// Build the application, or the bootstrap error app if anything is missing.
async fn build_app(config: Result<PlatformConfig, String>) -> (Router, SocketAddr) {
    let config = match config {
        Ok(config) => config,
        Err(message) => {
            tracing::error!(error = %message, "Configuration failed; serving error page");
            return (server::bootstrap_error_app(message), fallback_addr());
        }
    };
    let addr = config.socket_addr();

    let pool = match db::create_pool(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "Database connection failed; serving error page");
            return (
                server::bootstrap_error_app("The database is unreachable."),
                addr,
            );
        }
    };
    tracing::info!("Database pool created");

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p storeloom-cli -- migrate

    match AppState::from_config(&config, &pool) {
        Ok(state) => {
            if config.billing.is_none() {
                tracing::warn!("Billing is not configured; billing routes will answer 503");
            }
            (server::app(state), addr)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to build application state; serving error page");
            (server::bootstrap_error_app(e.to_string()), addr)
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from environment (needed for Sentry init)
    let config = PlatformConfig::from_env().map_err(|e| e.to_string());

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    let log_format = config
        .as_ref()
        .map_or_else(|_| env_log_format(), |c| c.log_format);
    init_tracing(log_format);

    let (app, addr) = build_app(config).await;
    let app = app
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    tracing::info!("storeloom listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
