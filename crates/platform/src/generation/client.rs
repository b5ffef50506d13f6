//! HTTP client for the generative content APIs.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use crate::config::GenerationConfig;

use super::error::ApiErrorResponse;
use super::{CompletionRequest, ContentGenerator, GeneratedMedia, GenerationError, RetryPolicy};

const COMPLETIONS_PATH: &str = "v1/completions";
const IMAGE_GENERATIONS_PATH: &str = "v1/images/generations";
const IMAGE_EDITS_PATH: &str = "v1/images/edits";
const PAGES_PATH: &str = "v1/pages";
const VIDEOS_PATH: &str = "v1/videos";

/// Fallback when a rate-limited response carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Generation API client.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct GenerationClient {
    inner: Arc<GenerationClientInner>,
}

struct GenerationClientInner {
    client: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("retry", &self.inner.retry)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    text: String,
}

#[derive(Debug, Serialize)]
struct PromptBody<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
struct SourcedPromptBody<'a> {
    image_url: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    html: String,
}

#[derive(Debug, Deserialize)]
struct MediaResponse {
    #[serde(default)]
    data: Vec<MediaItem>,
}

#[derive(Debug, Deserialize)]
struct MediaItem {
    url: Option<Url>,
    b64_json: Option<String>,
    mime_type: Option<String>,
}

impl MediaResponse {
    /// First usable item, preferring hosted URLs over inline data.
    fn into_media(self, default_mime: &str) -> Result<GeneratedMedia, GenerationError> {
        let item = self
            .data
            .into_iter()
            .find(|item| item.url.is_some() || item.b64_json.is_some())
            .ok_or(GenerationError::EmptyResult("media"))?;

        match (item.url, item.b64_json) {
            (Some(url), _) => Ok(GeneratedMedia::Url { url }),
            (None, Some(data)) => Ok(GeneratedMedia::Inline {
                mime_type: item.mime_type.unwrap_or_else(|| default_mime.to_string()),
                data,
            }),
            (None, None) => Err(GenerationError::EmptyResult("media")),
        }
    }
}

// =============================================================================
// Client
// =============================================================================

impl GenerationClient {
    /// Create a new generation client.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Config`] if the API key is not a valid
    /// header value or the HTTP client cannot be built.
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose_secret()))
            .map_err(|_| GenerationError::Config("API key is not a valid header value".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenerationError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(GenerationClientInner {
                client,
                base_url: config.api_url.clone(),
                retry: RetryPolicy::new(config.max_attempts),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GenerationError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| GenerationError::Config(format!("invalid endpoint {path}: {e}")))
    }

    /// POST `body` to `path` under the retry policy.
    async fn post<B, R>(&self, path: &'static str, body: &B) -> Result<R, GenerationError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let this = self;
        self.inner
            .retry
            .run(path, move || this.post_once(url.clone(), body))
            .await
    }

    async fn post_once<B, R>(&self, url: Url, body: &B) -> Result<R, GenerationError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self.inner.client.post(url).json(body).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(GenerationError::RateLimited(retry_after));
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(parse_api_error(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| GenerationError::Parse(format!("failed to parse response: {e}")))
    }
}

/// Map an error status and body to a [`GenerationError`].
fn parse_api_error(status: StatusCode, body: &str) -> GenerationError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return GenerationError::Unauthorized("invalid API key".to_string());
    }

    let message = serde_json::from_str::<ApiErrorResponse>(body)
        .map_or_else(|_| body.trim().to_string(), |e| e.error.message);

    GenerationError::Api {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl ContentGenerator for GenerationClient {
    #[instrument(skip_all, fields(prompt_len = request.prompt.len()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        let response: CompletionResponse = self.post(COMPLETIONS_PATH, request).await?;
        if response.text.trim().is_empty() {
            return Err(GenerationError::EmptyResult("text"));
        }
        Ok(response.text)
    }

    #[instrument(skip_all)]
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedMedia, GenerationError> {
        let response: MediaResponse = self
            .post(IMAGE_GENERATIONS_PATH, &PromptBody { prompt })
            .await?;
        response.into_media("image/png")
    }

    #[instrument(skip_all, fields(source = %source))]
    async fn edit_image(
        &self,
        source: &Url,
        prompt: &str,
    ) -> Result<GeneratedMedia, GenerationError> {
        let body = SourcedPromptBody {
            image_url: source.as_str(),
            prompt,
        };
        let response: MediaResponse = self.post(IMAGE_EDITS_PATH, &body).await?;
        response.into_media("image/png")
    }

    #[instrument(skip_all)]
    async fn generate_page(&self, prompt: &str) -> Result<String, GenerationError> {
        let response: PageResponse = self.post(PAGES_PATH, &PromptBody { prompt }).await?;
        if response.html.trim().is_empty() {
            return Err(GenerationError::EmptyResult("page"));
        }
        Ok(response.html)
    }

    #[instrument(skip_all, fields(source = %source))]
    async fn generate_video(
        &self,
        source: &Url,
        prompt: &str,
    ) -> Result<GeneratedMedia, GenerationError> {
        let body = SourcedPromptBody {
            image_url: source.as_str(),
            prompt,
        };
        let response: MediaResponse = self.post(VIDEOS_PATH, &body).await?;
        response.into_media("video/mp4")
    }
}
