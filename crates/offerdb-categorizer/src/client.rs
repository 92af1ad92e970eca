//! HTTP client for the Gemini `generateContent` API, used to label grocery
//! products with Swedish store categories.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use offerdb_core::CategoryMap;
use reqwest::{Client, Url};

use crate::error::CategorizerError;
use crate::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
};
use crate::Categorizer;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";
const API_KEY_HEADER: &str = "x-goog-api-key";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
pub const DEFAULT_BATCH_SIZE: usize = 50;

const PROMPT_HEADER: &str = "You are a grocery product categorizer for a Swedish store.
Categorize the following products into standard Swedish grocery categories (e.g., Frukt & Grönt, Mejeri, Kött, Chark, Skafferi, Dryck, Bröd & Kakor, Frys, Hem & Hushåll, Hälsa & Skönhet, Barn, Husdjur).
A product can belong to multiple categories.
Return ONLY a JSON object where keys are product names and values are arrays of category strings.
Do not include markdown formatting like ```json.

Products:
";

/// Client for Gemini-backed product categorization.
///
/// Use [`GeminiCategorizer::new`] for production or
/// [`GeminiCategorizer::with_base_url`] to point at a mock server in tests.
pub struct GeminiCategorizer {
    client: Client,
    api_key: String,
    base_url: Url,
    model: String,
    batch_size: usize,
}

impl GeminiCategorizer {
    /// Creates a client pointed at the production Gemini API.
    ///
    /// # Errors
    ///
    /// Returns [`CategorizerError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        api_key: &str,
        timeout_secs: u64,
        batch_size: usize,
    ) -> Result<Self, CategorizerError> {
        Self::with_base_url(api_key, timeout_secs, batch_size, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`CategorizerError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`CategorizerError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        batch_size: usize,
        base_url: &str,
    ) -> Result<Self, CategorizerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("offerdb/0.1 (offer-categorization)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| CategorizerError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            model: DEFAULT_MODEL.to_string(),
            batch_size: batch_size.max(1),
        })
    }

    #[must_use]
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    fn endpoint(&self) -> Result<Url, CategorizerError> {
        let path = format!("v1beta/models/{}:generateContent", self.model);
        self.base_url
            .join(&path)
            .map_err(|e| CategorizerError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    /// Categorizes one batch of product names with a single API call. The
    /// key travels in a header so request URLs stay free of credentials.
    ///
    /// # Errors
    ///
    /// - [`CategorizerError::Http`] on network failure or non-2xx status.
    /// - [`CategorizerError::EmptyResponse`] if the model returned no text.
    /// - [`CategorizerError::Deserialize`] if the envelope or the model's
    ///   JSON answer does not have the expected shape.
    pub async fn categorize_batch(
        &self,
        names: &[String],
    ) -> Result<CategoryMap, CategorizerError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(build_prompt(names)),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .client
            .post(self.endpoint()?)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;

        let envelope: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| CategorizerError::Deserialize {
                context: "generateContent response".to_string(),
                source: e,
            })?;
        let text = envelope.first_text().ok_or(CategorizerError::EmptyResponse)?;

        parse_category_json(text)
    }
}

#[async_trait]
impl Categorizer for GeminiCategorizer {
    /// Categorizes `product_names` in batches. Duplicate names are sent once.
    /// A failing batch is logged and skipped; the rest still contribute.
    async fn categorize(&self, product_names: &[String]) -> CategoryMap {
        let unique: Vec<String> = product_names
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut categories = CategoryMap::new();
        if unique.is_empty() {
            return categories;
        }

        for (index, batch) in unique.chunks(self.batch_size).enumerate() {
            match self.categorize_batch(batch).await {
                Ok(result) => {
                    tracing::debug!(batch = index, labelled = result.len(), "batch categorized");
                    categories.extend(result);
                }
                Err(e) => {
                    tracing::warn!(
                        batch = index,
                        size = batch.len(),
                        error = %e,
                        "categorization batch failed; skipping"
                    );
                }
            }
        }

        tracing::info!(
            products = unique.len(),
            labelled = categories.len(),
            "categorization complete"
        );
        categories
    }
}

fn build_prompt(names: &[String]) -> String {
    format!("{PROMPT_HEADER}{}", names.join("\n"))
}

/// Removes a surrounding markdown code fence, if the model added one anyway.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

fn parse_category_json(text: &str) -> Result<CategoryMap, CategorizerError> {
    let cleaned = strip_code_fence(text);
    let raw: HashMap<String, Vec<String>> =
        serde_json::from_str(cleaned).map_err(|e| CategorizerError::Deserialize {
            context: "model category JSON".to_string(),
            source: e,
        })?;

    Ok(raw
        .into_iter()
        .map(|(name, labels)| {
            let labels: BTreeSet<String> = labels
                .into_iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect();
            (name.trim().to_string(), labels)
        })
        .collect())
}
