//! Prompt builders and response parsers for wizard assists.
//!
//! Structured results are requested as JSON. Models frequently wrap JSON in
//! a fenced code block, so parsers strip fences before decoding.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CompletionRequest, GenerationError};

const STOREFRONT_SYSTEM: &str = "You are a merchandising assistant for small online stores. \
Answer with exactly what is asked, without commentary.";

/// Most items a single batch request may ask for.
pub const MAX_BATCH: usize = 12;

/// A product proposed by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSuggestion {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub description: String,
    /// Prompt for the product photo, when the model supplied one.
    #[serde(default)]
    pub image_prompt: Option<String>,
}

/// A collection proposed by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSuggestion {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Names of existing products that belong in the collection.
    #[serde(default)]
    pub product_names: Vec<String>,
}

/// Ask for a single store name.
#[must_use]
pub fn store_name_request(context: &str) -> CompletionRequest {
    CompletionRequest::new(format!(
        "Suggest one short, memorable name for an online store. Store concept: {context}\n\
         Reply with the name only."
    ))
    .with_system(STOREFRONT_SYSTEM)
}

/// Extract the store name from a completion.
///
/// # Errors
///
/// Returns [`GenerationError::EmptyResult`] if nothing usable remains after
/// trimming quotes and whitespace.
pub fn parse_store_name(text: &str) -> Result<String, GenerationError> {
    let name = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '*')
        .trim();

    if name.is_empty() {
        return Err(GenerationError::EmptyResult("store name"));
    }
    Ok(name.to_string())
}

/// Ask for `count` products as a JSON array.
#[must_use]
pub fn products_request(context: &str, count: usize) -> CompletionRequest {
    let count = count.clamp(1, MAX_BATCH);
    CompletionRequest::new(format!(
        "Create {count} products for an online store. Store concept: {context}\n\
         Reply with a JSON array of objects with fields \
         \"name\" (string), \"price\" (number, USD), \"description\" (string) \
         and \"image_prompt\" (string describing a product photo)."
    ))
    .with_system(STOREFRONT_SYSTEM)
}

/// Parse a products completion.
///
/// Entries without a name or with a non-positive price are dropped.
///
/// # Errors
///
/// Returns [`GenerationError::Parse`] for malformed JSON and
/// [`GenerationError::EmptyResult`] when no valid product remains.
pub fn parse_products(text: &str) -> Result<Vec<ProductSuggestion>, GenerationError> {
    let products: Vec<ProductSuggestion> = parse_json(text)?;
    let products: Vec<_> = products
        .into_iter()
        .filter(|p| !p.name.trim().is_empty() && p.price > Decimal::ZERO)
        .collect();

    if products.is_empty() {
        return Err(GenerationError::EmptyResult("products"));
    }
    Ok(products)
}

/// Ask for `count` collections grouping the given products.
#[must_use]
pub fn collections_request(context: &str, product_names: &[&str], count: usize) -> CompletionRequest {
    let count = count.clamp(1, MAX_BATCH);
    let products = if product_names.is_empty() {
        "none yet".to_string()
    } else {
        product_names.join(", ")
    };
    CompletionRequest::new(format!(
        "Create {count} product collections for an online store. Store concept: {context}\n\
         Existing products: {products}\n\
         Reply with a JSON array of objects with fields \"name\" (string), \
         \"description\" (string) and \"product_names\" (array of existing product names)."
    ))
    .with_system(STOREFRONT_SYSTEM)
}

/// Parse a collections completion.
///
/// # Errors
///
/// Returns [`GenerationError::Parse`] for malformed JSON and
/// [`GenerationError::EmptyResult`] when no named collection remains.
pub fn parse_collections(text: &str) -> Result<Vec<CollectionSuggestion>, GenerationError> {
    let collections: Vec<CollectionSuggestion> = parse_json(text)?;
    let collections: Vec<_> = collections
        .into_iter()
        .filter(|c| !c.name.trim().is_empty())
        .collect();

    if collections.is_empty() {
        return Err(GenerationError::EmptyResult("collections"));
    }
    Ok(collections)
}

/// Image prompt for a store logo.
#[must_use]
pub fn logo_prompt(store_name: &str, style: &str) -> String {
    let style = if style.trim().is_empty() {
        "clean, modern, flat"
    } else {
        style.trim()
    };
    format!("A logo for an online store named \"{store_name}\". Style: {style}. Plain background, no mockup.")
}

/// Image prompt for a product photo.
#[must_use]
pub fn product_image_prompt(name: &str, description: &str) -> String {
    if description.trim().is_empty() {
        format!("Studio product photo of {name}, soft lighting, neutral background.")
    } else {
        format!(
            "Studio product photo of {name}: {}. Soft lighting, neutral background.",
            description.trim()
        )
    }
}

/// Page prompt for a store landing page.
#[must_use]
pub fn landing_page_prompt(store_name: &str, style_prompt: &str, product_names: &[&str]) -> String {
    let style = if style_prompt.trim().is_empty() {
        "minimal and modern"
    } else {
        style_prompt.trim()
    };
    format!(
        "Design a responsive single-page storefront landing page for \"{store_name}\". \
         Visual style: {style}. Feature these products: {}.",
        product_names.join(", ")
    )
}

/// Decode JSON from a completion, tolerating a surrounding code fence.
fn parse_json<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, GenerationError> {
    serde_json::from_str(extract_json(text))
        .map_err(|e| GenerationError::Parse(format!("invalid JSON in completion: {e}")))
}

/// Strip a Markdown code fence (with or without a language tag).
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_plain() {
        assert_eq!(extract_json("  [1, 2] "), "[1, 2]");
    }

    #[test]
    fn test_extract_json_fenced() {
        assert_eq!(extract_json("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(extract_json("```\n{\"a\": 1}\n```\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_store_name_strips_quotes() {
        assert_eq!(parse_store_name("\n\"Pine & Thread\"\n").expect("name"), "Pine & Thread");
        assert!(matches!(
            parse_store_name("  \"\" "),
            Err(GenerationError::EmptyResult(_))
        ));
    }

    #[test]
    fn test_parse_products_drops_invalid_entries() {
        let text = r#"```json
[
  {"name": "Linen Shirt", "price": 48.5, "description": "Breathable", "image_prompt": "shirt on a hanger"},
  {"name": "", "price": 10},
  {"name": "Free Sticker", "price": 0}
]
```"#;
        let products = parse_products(text).expect("products");
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Linen Shirt");
        assert_eq!(products[0].price, Decimal::new(485, 1));
        assert_eq!(products[0].image_prompt.as_deref(), Some("shirt on a hanger"));
    }

    #[test]
    fn test_parse_products_malformed() {
        assert!(matches!(
            parse_products("not json"),
            Err(GenerationError::Parse(_))
        ));
        assert!(matches!(
            parse_products("[]"),
            Err(GenerationError::EmptyResult("products"))
        ));
    }

    #[test]
    fn test_parse_collections() {
        let text = r#"[{"name": "Summer", "product_names": ["Linen Shirt"]}, {"name": " "}]"#;
        let collections = parse_collections(text).expect("collections");
        assert_eq!(collections.len(), 1);
        assert_eq!(collections[0].product_names, vec!["Linen Shirt"]);
        assert!(collections[0].description.is_empty());
    }

    #[test]
    fn test_batch_size_is_clamped() {
        let request = products_request("tea", 500);
        assert!(request.prompt.starts_with(&format!("Create {MAX_BATCH} products")));
        let request = collections_request("tea", &[], 0);
        assert!(request.prompt.starts_with("Create 1 product collections"));
        assert!(request.prompt.contains("Existing products: none yet"));
    }

    #[test]
    fn test_logo_prompt_default_style() {
        let prompt = logo_prompt("Fernwood", "  ");
        assert!(prompt.contains("\"Fernwood\""));
        assert!(prompt.contains("clean, modern, flat"));
    }
}
