//! Gemini embedding provider.
//!
//! Calls the `models/{model}:embedContent` REST endpoint with the API key
//! as a query parameter.

use crate::error::{Error, Result};
use crate::http::{build_client, send_with_retry, RetryPolicy};
use serde::{Deserialize, Serialize};

use super::provider::EmbeddingProvider;
use super::types::{gemini_models, ProviderInfo};

/// Gemini embedding provider.
pub struct GeminiEmbeddingProvider {
    client: reqwest::Client,
    policy: RetryPolicy,
    endpoint: String,
    api_key: String,
    model: String,
    dimensions: usize,
    max_chars: usize,
}

impl GeminiEmbeddingProvider {
    /// Create a provider for `model` at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns `Config` for an empty API key, or `Http` if the client
    /// cannot be built.
    pub fn new(endpoint: &str, api_key: &str, model: &str, policy: RetryPolicy) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config("GEMINI_API_KEY is not set".into()));
        }
        let model = model.trim_start_matches("models/").to_string();
        let config = gemini_models::get_config(&model);

        Ok(Self {
            client: build_client(&policy)?,
            policy,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model,
            dimensions: config.dimensions,
            max_chars: config.max_chars,
        })
    }

    fn embed_url(&self) -> String {
        format!("{}/models/{}:embedContent", self.endpoint, self.model)
    }
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: Option<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

impl EmbeddingProvider for GeminiEmbeddingProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "gemini".to_string(),
            model: self.model.clone(),
            dimensions: self.dimensions,
            max_chars: self.max_chars,
        }
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/models/{}", self.endpoint, self.model);
        self.client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let url = self.embed_url();
        let request = EmbedContentRequest {
            model: format!("models/{}", self.model),
            content: Content {
                parts: [Part { text }],
            },
        };

        let response = send_with_retry("gemini-embed", &self.policy, || {
            self.client
                .post(&url)
                .query(&[("key", self.api_key.as_str())])
                .json(&request)
        })
        .await
        .map_err(|e| Error::Embedding(format!("Gemini embedding failed: {e}")))?;

        let data: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Failed to parse Gemini response: {e}")))?;

        data.embedding
            .map(|e| e.values)
            .filter(|values| !values.is_empty())
            .ok_or_else(|| Error::Embedding("No embedding returned from Gemini".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        let result = GeminiEmbeddingProvider::new(
            "https://example.invalid/v1beta",
            "  ",
            "text-embedding-004",
            RetryPolicy::default(),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_info_and_url() {
        let provider = GeminiEmbeddingProvider::new(
            "https://example.invalid/v1beta/",
            "key",
            "models/text-embedding-004",
            RetryPolicy::default(),
        )
        .unwrap();

        let info = provider.info();
        assert_eq!(info.name, "gemini");
        assert_eq!(info.model, "text-embedding-004");
        assert_eq!(info.dimensions, 768);
        assert_eq!(
            provider.embed_url(),
            "https://example.invalid/v1beta/models/text-embedding-004:embedContent"
        );
    }

    #[test]
    fn test_request_shape() {
        let request = EmbedContentRequest {
            model: "models/text-embedding-004".to_string(),
            content: Content {
                parts: [Part { text: "Trilha" }],
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["content"]["parts"][0]["text"], "Trilha");
        assert_eq!(json["model"], "models/text-embedding-004");
    }
}
