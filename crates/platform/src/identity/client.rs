//! HTTP client for the identity provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use storeloom_core::AccountId;
use tracing::instrument;
use url::Url;

use super::{AccountSession, AuthError, IdentityProvider, SignInForm, SignedIn};
use crate::config::IdentityConfig;

const LOOKUP_PATH: &str = "v1/accounts:lookup";
const SIGN_IN_PATH: &str = "v1/accounts:signInWithPassword";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity provider over HTTP.
#[derive(Clone)]
pub struct IdentityClient {
    client: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<ProviderUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderUser {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
}

impl From<ProviderUser> for AccountSession {
    fn from(user: ProviderUser) -> Self {
        Self {
            account_id: AccountId::new(user.local_id),
            email: user.email,
            display_name: user.display_name.filter(|name| !name.trim().is_empty()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordSignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordSignInResponse {
    id_token: String,
    #[serde(flatten)]
    user: ProviderUser,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorResponse {
    error: ProviderError,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: String,
}

impl IdentityClient {
    /// Create a new identity client.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the API key is not a valid header
    /// value or the HTTP client cannot be built.
    pub fn new(config: &IdentityConfig) -> Result<Self, AuthError> {
        let mut key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|_| AuthError::Config("API key is not a valid header value".into()))?;
        key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
        })
    }

    async fn post<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, AuthError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| AuthError::Config(format!("invalid identity endpoint: {e}")))?;

        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(provider_error(&text));
        }
        serde_json::from_str(&text)
            .map_err(|e| AuthError::Provider(format!("unparseable response: {e}")))
    }
}

/// Map an error body to an [`AuthError`].
fn provider_error(body: &str) -> AuthError {
    serde_json::from_str::<ProviderErrorResponse>(body).map_or_else(
        |_| AuthError::Provider("UNKNOWN".to_string()),
        |e| AuthError::from_provider_code(&e.error.message),
    )
}

#[async_trait]
impl IdentityProvider for IdentityClient {
    #[instrument(skip_all)]
    async fn verify_token(&self, token: &str) -> Result<AccountSession, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }
        let response: LookupResponse = self
            .post(LOOKUP_PATH, &LookupRequest { id_token: token })
            .await?;

        response
            .users
            .into_iter()
            .next()
            .map(AccountSession::from)
            .ok_or(AuthError::InvalidToken)
    }

    #[instrument(skip_all)]
    async fn sign_in(&self, form: &SignInForm) -> Result<SignedIn, AuthError> {
        form.validate()?;
        let response: PasswordSignInResponse = self
            .post(
                SIGN_IN_PATH,
                &PasswordSignInRequest {
                    email: form.email.trim(),
                    password: &form.password,
                    return_secure_token: true,
                },
            )
            .await?;

        let session = AccountSession::from(response.user);
        tracing::info!(account = %session.account_id, "Signed in");
        Ok(SignedIn {
            id_token: response.id_token,
            session,
        })
    }
}
