//! Object storage for generated media.
//!
//! Generated media arrives either as a hosted URL or as inline base64. Inline
//! media is decoded and uploaded under
//! `accounts/{account}/generated/{uuid}.{ext}` so that everything saved on a
//! store record is a retrievable URL.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use storeloom_core::AccountId;
use thiserror::Error;
use tracing::instrument;
use url::Url;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::generation::GeneratedMedia;

/// Errors raised by media storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Storage answered with an error status.
    #[error("upload rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Inline media was not valid base64.
    #[error("invalid media payload: {0}")]
    InvalidPayload(#[from] base64::DecodeError),

    /// Object path is empty or escapes its prefix.
    #[error("invalid object path: {0}")]
    InvalidPath(String),

    /// The client is misconfigured.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Upload-by-path object storage.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Store `bytes` at `path` and return a URL that serves them.
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<Url, StorageError>;
}

/// Object path for a newly generated asset.
#[must_use]
pub fn media_path(account: &AccountId, extension: &str) -> String {
    format!("accounts/{account}/generated/{}.{extension}", Uuid::new_v4())
}

/// File extension for a media MIME type.
#[must_use]
pub fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/svg+xml" => "svg",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "text/html" => "html",
        "image/png" => "png",
        _ => "bin",
    }
}

fn validate_path(path: &str) -> Result<(), StorageError> {
    let invalid = path.is_empty()
        || path.starts_with('/')
        || path.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if invalid {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Turn generated media into a URL owned by the platform.
///
/// Hosted media is returned as-is; inline media is decoded and uploaded.
///
/// # Errors
///
/// Returns [`StorageError::InvalidPayload`] for bad base64 or any upload error.
#[instrument(skip_all, fields(account = %account))]
pub async fn persist_generated(
    storage: &dyn MediaStorage,
    account: &AccountId,
    media: GeneratedMedia,
) -> Result<Url, StorageError> {
    match media {
        GeneratedMedia::Url { url } => Ok(url),
        GeneratedMedia::Inline { mime_type, data } => {
            let bytes = STANDARD.decode(data.trim())?;
            let path = media_path(account, extension_for(&mime_type));
            storage.upload(&path, bytes, &mime_type).await
        }
    }
}

/// Storage client speaking a bearer-authenticated `PUT {base}/{path}` API.
#[derive(Clone)]
pub struct HttpMediaStorage {
    inner: Arc<HttpMediaStorageInner>,
}

struct HttpMediaStorageInner {
    client: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for HttpMediaStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMediaStorage")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpMediaStorage {
    /// Create a new storage client.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] if the key is not a valid header value
    /// or the HTTP client cannot be built.
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose_secret()))
            .map_err(|_| StorageError::Config("API key is not a valid header value".into()))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StorageError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(HttpMediaStorageInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    fn object_url(&self, path: &str) -> Result<Url, StorageError> {
        validate_path(path)?;
        self.inner
            .base_url
            .join(path)
            .map_err(|e| StorageError::InvalidPath(format!("{path}: {e}")))
    }
}

#[async_trait]
impl MediaStorage for HttpMediaStorage {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<Url, StorageError> {
        let url = self.object_url(path)?;
        let content_type = HeaderValue::from_str(content_type)
            .map_err(|_| StorageError::Config(format!("invalid content type {content_type:?}")))?;

        let response = self
            .inner
            .client
            .put(url.clone())
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(url = %url, "Uploaded media");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingStorage {
        uploads: Mutex<Vec<(String, Vec<u8>, String)>>,
    }

    #[async_trait]
    impl MediaStorage for RecordingStorage {
        async fn upload(
            &self,
            path: &str,
            bytes: Vec<u8>,
            content_type: &str,
        ) -> Result<Url, StorageError> {
            self.uploads
                .lock()
                .expect("lock")
                .push((path.to_string(), bytes, content_type.to_string()));
            Ok(Url::parse("https://media.example.com/")
                .expect("url")
                .join(path)
                .expect("join"))
        }
    }

    #[test]
    fn test_media_path_layout() {
        let path = media_path(&AccountId::new("acct-9"), "png");
        let rest = path
            .strip_prefix("accounts/acct-9/generated/")
            .expect("prefix");
        let (id, ext) = rest.rsplit_once('.').expect("extension");
        assert_eq!(ext, "png");
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("video/mp4"), "mp4");
        assert_eq!(extension_for("application/x-unknown"), "bin");
    }

    #[test]
    fn test_validate_path() {
        assert!(validate_path("accounts/a/generated/x.png").is_ok());
        assert!(validate_path("").is_err());
        assert!(validate_path("/abs").is_err());
        assert!(validate_path("accounts/../secret").is_err());
        assert!(validate_path("accounts//x").is_err());
    }

    #[tokio::test]
    async fn test_persist_hosted_media_skips_upload() {
        let storage = RecordingStorage::default();
        let url = Url::parse("https://gen.example.com/img.png").expect("url");

        let persisted = persist_generated(
            &storage,
            &AccountId::new("acct"),
            GeneratedMedia::Url { url: url.clone() },
        )
        .await
        .expect("persist");

        assert_eq!(persisted, url);
        assert!(storage.uploads.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn test_persist_inline_media_decodes_and_uploads() {
        let storage = RecordingStorage::default();

        let persisted = persist_generated(
            &storage,
            &AccountId::new("acct"),
            GeneratedMedia::Inline {
                mime_type: "image/webp".to_string(),
                data: "aGVsbG8=".to_string(),
            },
        )
        .await
        .expect("persist");

        let uploads = storage.uploads.lock().expect("lock");
        assert_eq!(uploads.len(), 1);
        let (path, bytes, content_type) = &uploads[0];
        assert!(path.starts_with("accounts/acct/generated/"));
        assert!(path.ends_with(".webp"));
        assert_eq!(bytes, b"hello");
        assert_eq!(content_type, "image/webp");
        assert!(persisted.as_str().ends_with(".webp"));
    }

    #[tokio::test]
    async fn test_persist_rejects_bad_base64() {
        let storage = RecordingStorage::default();
        let result = persist_generated(
            &storage,
            &AccountId::new("acct"),
            GeneratedMedia::Inline {
                mime_type: "image/png".to_string(),
                data: "***".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(StorageError::InvalidPayload(_))));
    }
}
