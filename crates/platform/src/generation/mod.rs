//! Generative content APIs.
//!
//! [`ContentGenerator`] is the seam the rest of the platform depends on;
//! [`GenerationClient`] is the HTTP implementation. Every call made by the
//! client goes through the same [`RetryPolicy`].
//!
//! # Operations
//!
//! | Operation        | Input             | Output          |
//! |------------------|-------------------|-----------------|
//! | `complete`       | system + prompt   | text            |
//! | `generate_image` | prompt            | media           |
//! | `edit_image`     | image URL + prompt| media           |
//! | `generate_page`  | prompt            | HTML            |
//! | `generate_video` | image URL + prompt| media           |

pub mod client;
pub mod error;
pub mod prompts;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

pub use client::GenerationClient;
pub use error::GenerationError;
pub use retry::RetryPolicy;

/// A text completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRequest {
    /// Optional system instructions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// User prompt.
    pub prompt: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Default token budget for completions.
    pub const DEFAULT_MAX_TOKENS: u32 = 2048;

    /// Create a request with the default token budget.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens: Self::DEFAULT_MAX_TOKENS,
        }
    }

    /// Set the system instructions.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Media produced by a generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratedMedia {
    /// Hosted by the generation API.
    Url { url: Url },
    /// Returned inline as base64.
    Inline { mime_type: String, data: String },
}

/// Generative content operations.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Complete a text prompt.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError>;

    /// Generate an image from a prompt.
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedMedia, GenerationError>;

    /// Edit an existing image according to a prompt.
    async fn edit_image(&self, source: &Url, prompt: &str)
    -> Result<GeneratedMedia, GenerationError>;

    /// Generate an HTML page from a prompt.
    async fn generate_page(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Animate an image into a short video.
    async fn generate_video(
        &self,
        source: &Url,
        prompt: &str,
    ) -> Result<GeneratedMedia, GenerationError>;
}
