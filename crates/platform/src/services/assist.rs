//! Credit-gated AI assists.
//!
//! Each [`AssistRequest`] maps to one [`PricedAction`]. The [`Assistant`]
//! runs the generation call and any media upload inside the credit gate, so
//! an assist is charged only once its output is safely stored.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use storeloom_core::{AccountId, PricedAction};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::credits::{CreditGate, GateError};
use crate::generation::prompts::{self, CollectionSuggestion, ProductSuggestion};
use crate::generation::{ContentGenerator, GenerationError};
use crate::storage::{self, MediaStorage, StorageError};

/// Default batch size for product and collection assists.
pub const DEFAULT_BATCH: usize = 4;

const fn default_batch() -> usize {
    DEFAULT_BATCH
}

/// An AI assist the caller wants to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AssistRequest {
    StoreName {
        context: String,
    },
    Logo {
        store_name: String,
        #[serde(default)]
        style: String,
    },
    Products {
        context: String,
        #[serde(default = "default_batch")]
        count: usize,
    },
    Collections {
        context: String,
        #[serde(default)]
        product_names: Vec<String>,
        #[serde(default = "default_batch")]
        count: usize,
    },
    ProductImage {
        name: String,
        #[serde(default)]
        description: String,
    },
    EditImage {
        source: Url,
        prompt: String,
    },
    Page {
        prompt: String,
    },
    Video {
        source: Url,
        #[serde(default)]
        prompt: String,
    },
}

impl AssistRequest {
    /// The price list entry this assist is charged under.
    #[must_use]
    pub const fn priced_action(&self) -> PricedAction {
        match self {
            Self::StoreName { .. } => PricedAction::StoreName,
            Self::Logo { .. } => PricedAction::Logo,
            Self::Products { .. } => PricedAction::Products,
            Self::Collections { .. } => PricedAction::Collections,
            Self::ProductImage { .. } => PricedAction::ProductImage,
            Self::EditImage { .. } => PricedAction::ImageEdit,
            Self::Page { .. } => PricedAction::Page,
            Self::Video { .. } => PricedAction::Video,
        }
    }
}

/// Result of an assist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssistOutput {
    StoreName { name: String },
    Image { url: Url },
    Products { products: Vec<ProductSuggestion> },
    Collections { collections: Vec<CollectionSuggestion> },
    Page { html: String },
    Video { url: Url },
}

/// Failure inside a gated assist.
#[derive(Debug, Error)]
pub enum AssistError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Runs assists through the credit gate.
#[derive(Clone)]
pub struct Assistant {
    gate: CreditGate,
    generator: Arc<dyn ContentGenerator>,
    storage: Arc<dyn MediaStorage>,
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl Assistant {
    /// Create an assistant.
    #[must_use]
    pub fn new(
        gate: CreditGate,
        generator: Arc<dyn ContentGenerator>,
        storage: Arc<dyn MediaStorage>,
    ) -> Self {
        Self {
            gate,
            generator,
            storage,
        }
    }

    /// Run `request` for `account`, charging its price on success.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Credits`] when the balance does not cover the
    /// price and [`GateError::Action`] when generation or upload fails.
    #[instrument(skip_all, fields(account = %account, action = %request.priced_action()))]
    pub async fn run(
        &self,
        account: &AccountId,
        request: AssistRequest,
    ) -> Result<AssistOutput, GateError<AssistError>> {
        let priced = request.priced_action();
        self.gate
            .run(account, priced, || self.execute(account, request))
            .await
    }

    async fn execute(
        &self,
        account: &AccountId,
        request: AssistRequest,
    ) -> Result<AssistOutput, AssistError> {
        let generator = self.generator.as_ref();
        let output = match request {
            AssistRequest::StoreName { context } => {
                let text = generator
                    .complete(&prompts::store_name_request(&context))
                    .await?;
                AssistOutput::StoreName {
                    name: prompts::parse_store_name(&text)?,
                }
            }
            AssistRequest::Logo { store_name, style } => {
                let media = generator
                    .generate_image(&prompts::logo_prompt(&store_name, &style))
                    .await?;
                AssistOutput::Image {
                    url: self.persist(account, media).await?,
                }
            }
            AssistRequest::Products { context, count } => {
                let text = generator
                    .complete(&prompts::products_request(&context, count))
                    .await?;
                let mut products = prompts::parse_products(&text)?;
                products.truncate(count.clamp(1, prompts::MAX_BATCH));
                AssistOutput::Products { products }
            }
            AssistRequest::Collections {
                context,
                product_names,
                count,
            } => {
                let names: Vec<&str> = product_names.iter().map(String::as_str).collect();
                let text = generator
                    .complete(&prompts::collections_request(&context, &names, count))
                    .await?;
                let mut collections = prompts::parse_collections(&text)?;
                collections.truncate(count.clamp(1, prompts::MAX_BATCH));
                AssistOutput::Collections { collections }
            }
            AssistRequest::ProductImage { name, description } => {
                let media = generator
                    .generate_image(&prompts::product_image_prompt(&name, &description))
                    .await?;
                AssistOutput::Image {
                    url: self.persist(account, media).await?,
                }
            }
            AssistRequest::EditImage { source, prompt } => {
                let media = generator.edit_image(&source, &prompt).await?;
                AssistOutput::Image {
                    url: self.persist(account, media).await?,
                }
            }
            AssistRequest::Page { prompt } => AssistOutput::Page {
                html: generator.generate_page(&prompt).await?,
            },
            AssistRequest::Video { source, prompt } => {
                let media = generator.generate_video(&source, &prompt).await?;
                AssistOutput::Video {
                    url: self.persist(account, media).await?,
                }
            }
        };
        Ok(output)
    }

    async fn persist(
        &self,
        account: &AccountId,
        media: crate::generation::GeneratedMedia,
    ) -> Result<Url, StorageError> {
        storage::persist_generated(self.storage.as_ref(), account, media).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priced_actions() {
        let request = AssistRequest::Products {
            context: "tea".to_string(),
            count: 3,
        };
        assert_eq!(request.priced_action(), PricedAction::Products);
        assert_eq!(
            AssistRequest::EditImage {
                source: Url::parse("https://cdn.example.com/a.png").expect("url"),
                prompt: "brighter".to_string(),
            }
            .priced_action(),
            PricedAction::ImageEdit
        );
    }

    #[test]
    fn test_request_wire_format_defaults_batch() {
        let request: AssistRequest =
            serde_json::from_str(r#"{"action": "products", "context": "tea"}"#)
                .expect("deserialize");
        assert_eq!(
            request,
            AssistRequest::Products {
                context: "tea".to_string(),
                count: DEFAULT_BATCH,
            }
        );
    }

    #[test]
    fn test_output_wire_format() {
        let output = AssistOutput::StoreName {
            name: "Leaf & Co".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&output).expect("serialize"),
            serde_json::json!({"kind": "store_name", "name": "Leaf & Co"})
        );
    }
}
