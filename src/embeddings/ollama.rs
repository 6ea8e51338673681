//! Ollama embedding provider.
//!
//! Uses a local Ollama server for embedding generation, for offline use
//! without a Gemini key. The model's dimensions must match the collection's.

use crate::error::{Error, Result};
use crate::http::{build_client, send_with_retry, RetryPolicy};
use serde::{Deserialize, Serialize};

use super::provider::EmbeddingProvider;
use super::types::{ollama_models, ProviderInfo};

/// Ollama embedding provider.
pub struct OllamaProvider {
    client: reqwest::Client,
    policy: RetryPolicy,
    endpoint: String,
    model: String,
    dimensions: usize,
    max_chars: usize,
}

impl OllamaProvider {
    /// Create a new Ollama provider.
    ///
    /// # Errors
    ///
    /// Returns `Http` if the client cannot be built.
    pub fn with_config(endpoint: &str, model: &str, policy: RetryPolicy) -> Result<Self> {
        let config = ollama_models::get_config(model);

        Ok(Self {
            client: build_client(&policy)?,
            policy,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimensions: config.dimensions,
            max_chars: config.max_chars,
        })
    }
}

/// Ollama API response for listing models.
#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Option<Vec<OllamaModel>>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

/// Ollama API request for embedding.
#[derive(Debug, Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// Ollama API response for embedding.
#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl EmbeddingProvider for OllamaProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "ollama".to_string(),
            model: self.model.clone(),
            dimensions: self.dimensions,
            max_chars: self.max_chars,
        }
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.endpoint);

        let Ok(response) = self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(2))
            .send()
            .await
        else {
            return false;
        };

        if !response.status().is_success() {
            return false;
        }

        let Ok(data) = response.json::<OllamaTagsResponse>().await else {
            return false;
        };

        // Check if our model is pulled
        data.models.is_some_and(|models| {
            models
                .iter()
                .any(|m| m.name == self.model || m.name.starts_with(&format!("{}:", self.model)))
        })
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embed", self.endpoint);
        let request = OllamaEmbedRequest {
            model: &self.model,
            input: text,
        };

        let response = send_with_retry("ollama-embed", &self.policy, || {
            self.client.post(&url).json(&request)
        })
        .await
        .map_err(|e| Error::Embedding(format!("Ollama embedding failed: {e}")))?;

        let data: OllamaEmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Failed to parse Ollama response: {e}")))?;

        data.embeddings
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("No embeddings returned from Ollama".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_provider_custom_config() {
        let provider = OllamaProvider::with_config(
            "http://custom:11434/",
            "mxbai-embed-large",
            RetryPolicy::default(),
        )
        .unwrap();
        let info = provider.info();
        assert_eq!(info.name, "ollama");
        assert_eq!(info.model, "mxbai-embed-large");
        assert_eq!(info.dimensions, 1024);
        assert_eq!(provider.endpoint, "http://custom:11434");
    }
}
