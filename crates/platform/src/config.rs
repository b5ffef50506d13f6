//! Platform configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `STORELOOM_BASE_URL` - Public URL of the platform
//! - `GENERATION_API_URL` - Generative content API base URL
//! - `GENERATION_API_KEY` - Generative content API key
//! - `STORAGE_BASE_URL` - Object storage base URL
//! - `STORAGE_API_KEY` - Object storage API key
//! - `IDENTITY_API_URL` - Identity provider base URL
//! - `IDENTITY_API_KEY` - Identity provider API key
//!
//! ## Optional
//! - `STORELOOM_HOST` - Bind address (default: 127.0.0.1)
//! - `STORELOOM_PORT` - Listen port (default: 3000)
//! - `GENERATION_MAX_ATTEMPTS` - Attempts per generation call (default: 3)
//! - `LOG_FORMAT` - `json` for JSON logs, text otherwise
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 0.1)
//!
//! ## Optional (billing - set together)
//! - `BILLING_FUNCTIONS_URL` - Base URL of the billing callable functions
//! - `BILLING_WEBHOOK_SECRET` - Webhook signing secret

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::generation::retry::DEFAULT_MAX_ATTEMPTS;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Platform configuration.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: Url,
    pub generation: GenerationConfig,
    pub storage: StorageConfig,
    pub identity: IdentityConfig,
    /// Billing functions and webhook (optional)
    pub billing: Option<BillingConfig>,
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Generative content API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct GenerationConfig {
    pub api_url: Url,
    pub api_key: SecretString,
    /// Attempts per call, including the first
    pub max_attempts: u32,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("max_attempts", &self.max_attempts)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Object storage configuration.
#[derive(Clone)]
pub struct StorageConfig {
    pub base_url: Url,
    pub api_key: SecretString,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Identity provider configuration.
#[derive(Clone)]
pub struct IdentityConfig {
    pub api_url: Url,
    pub api_key: SecretString,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Billing configuration.
///
/// When absent, billing routes answer 503 and webhooks are rejected.
#[derive(Clone)]
pub struct BillingConfig {
    /// Base URL of the callable functions
    pub functions_url: Url,
    /// Webhook signing secret
    pub webhook_secret: SecretString,
}

impl std::fmt::Debug for BillingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingConfig")
            .field("functions_url", &self.functions_url.as_str())
            .field("webhook_secret", &"[REDACTED]")
            .finish()
    }
}

impl PlatformConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = SecretString::from(get_required_env("DATABASE_URL")?);
        let host = get_env_or_default("STORELOOM_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("STORELOOM_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("STORELOOM_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("STORELOOM_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_url("STORELOOM_BASE_URL")?;

        let generation = GenerationConfig::from_env()?;
        let storage = StorageConfig::from_env()?;
        let identity = IdentityConfig::from_env()?;
        let billing = BillingConfig::from_env()?;

        let log_format = match get_optional_env("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            generation,
            storage,
            identity,
            billing,
            log_format,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl GenerationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let max_attempts = match get_optional_env("GENERATION_MAX_ATTEMPTS") {
            Some(raw) => parse_max_attempts(&raw)?,
            None => DEFAULT_MAX_ATTEMPTS,
        };

        Ok(Self {
            api_url: get_required_url("GENERATION_API_URL")?,
            api_key: get_validated_secret("GENERATION_API_KEY")?,
            max_attempts,
            timeout: GENERATION_TIMEOUT,
        })
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: get_required_url("STORAGE_BASE_URL")?,
            api_key: get_validated_secret("STORAGE_API_KEY")?,
        })
    }
}

impl IdentityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: get_required_url("IDENTITY_API_URL")?,
            api_key: get_validated_secret("IDENTITY_API_KEY")?,
        })
    }
}

impl BillingConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let functions_url = get_optional_env("BILLING_FUNCTIONS_URL");
        let webhook_secret = get_optional_env("BILLING_WEBHOOK_SECRET");

        match (functions_url, webhook_secret) {
            (Some(url), Some(secret)) => {
                validate_secret_strength(&secret, "BILLING_WEBHOOK_SECRET")?;
                Ok(Some(Self {
                    functions_url: parse_base_url(&url, "BILLING_FUNCTIONS_URL")?,
                    webhook_secret: SecretString::from(secret),
                }))
            }
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "BILLING_*".to_string(),
                "Both BILLING_FUNCTIONS_URL and BILLING_WEBHOOK_SECRET must be set together"
                    .to_string(),
            )),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Get a required base URL.
fn get_required_url(key: &str) -> Result<Url, ConfigError> {
    parse_base_url(&get_required_env(key)?, key)
}

/// Parse an absolute http(s) URL usable as a `Url::join` base.
///
/// A missing trailing slash is added so that joining `v1/x` keeps the
/// configured path prefix.
fn parse_base_url(raw: &str, var_name: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_max_attempts(raw: &str) -> Result<u32, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        Ok(_) => Err(ConfigError::InvalidEnvVar(
            "GENERATION_MAX_ATTEMPTS".to_string(),
            "must be at least 1".to_string(),
        )),
        Err(e) => Err(ConfigError::InvalidEnvVar(
            "GENERATION_MAX_ATTEMPTS".to_string(),
            e.to_string(),
        )),
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated key."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(matches!(
            validate_secret_strength("your-api-key-here", "TEST_VAR"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
        assert!(validate_secret_strength("changeme123", "TEST_VAR").is_err());
        assert!(validate_secret_strength(&"a".repeat(40), "TEST_VAR").is_err());
        assert!(validate_secret_strength("gk_9fQ2xLm7TzR4vB8nW1pC6yH3", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_parse_base_url_adds_trailing_slash() {
        let url = parse_base_url("https://api.example.net/gen", "TEST_URL").unwrap();
        assert_eq!(url.as_str(), "https://api.example.net/gen/");
        assert_eq!(
            url.join("v1/pages").unwrap().as_str(),
            "https://api.example.net/gen/v1/pages"
        );

        let url = parse_base_url("https://api.example.net", "TEST_URL").unwrap();
        assert_eq!(url.as_str(), "https://api.example.net/");
    }

    #[test]
    fn test_parse_base_url_rejects_bad_input() {
        assert!(matches!(
            parse_base_url("not a url", "TEST_URL"),
            Err(ConfigError::InvalidEnvVar(var, _)) if var == "TEST_URL"
        ));
        assert!(parse_base_url("ftp://files.example.net/", "TEST_URL").is_err());
    }

    #[test]
    fn test_parse_max_attempts() {
        assert_eq!(parse_max_attempts("5").unwrap(), 5);
        assert!(parse_max_attempts("0").is_err());
        assert!(parse_max_attempts("many").is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = GenerationConfig {
            api_url: Url::parse("https://gen.example.net/").unwrap(),
            api_key: SecretString::from("gk_super_secret_generation_key"),
            max_attempts: 3,
            timeout: GENERATION_TIMEOUT,
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("gen.example.net"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("gk_super_secret_generation_key"));
        assert_eq!(config.api_key.expose_secret(), "gk_super_secret_generation_key");

        let billing = BillingConfig {
            functions_url: Url::parse("https://fn.example.net/").unwrap(),
            webhook_secret: SecretString::from("whsec_top_secret"),
        };
        assert!(!format!("{billing:?}").contains("whsec_top_secret"));
    }
}
