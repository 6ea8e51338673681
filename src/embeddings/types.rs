//! Embedding types and model tables.

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Embedding provider types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderType {
    /// Google Gemini embedding API (needs `GEMINI_API_KEY`).
    #[default]
    Gemini,
    /// Local Ollama server.
    Ollama,
}

impl std::fmt::Display for EmbeddingProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for EmbeddingProviderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            _ => Err(Error::Config(format!(
                "unknown embedding provider: {s} (expected gemini or ollama)"
            ))),
        }
    }
}

/// Provider metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub name: String,
    pub model: String,
    pub dimensions: usize,
    /// Longest input the pipeline sends to this model.
    pub max_chars: usize,
}

/// Model configuration with dimensions and max chars.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub name: String,
    pub dimensions: usize,
    pub max_chars: usize,
}

/// Gemini model configurations.
pub mod gemini_models {
    use super::ModelConfig;

    pub fn text_embedding_004() -> ModelConfig {
        ModelConfig {
            name: "text-embedding-004".to_string(),
            dimensions: 768,
            max_chars: 9000,
        }
    }

    pub fn get_config(model: &str) -> ModelConfig {
        match model {
            "text-embedding-004" | "models/text-embedding-004" => text_embedding_004(),
            _ => ModelConfig {
                name: model.to_string(),
                dimensions: 768, // Default assumption
                max_chars: 9000,
            },
        }
    }
}

/// Ollama model configurations.
pub mod ollama_models {
    use super::ModelConfig;

    pub fn nomic_embed_text() -> ModelConfig {
        ModelConfig {
            name: "nomic-embed-text".to_string(),
            dimensions: 768,
            max_chars: 5000,
        }
    }

    pub fn mxbai_embed_large() -> ModelConfig {
        ModelConfig {
            name: "mxbai-embed-large".to_string(),
            dimensions: 1024,
            max_chars: 1500,
        }
    }

    pub fn get_config(model: &str) -> ModelConfig {
        match model {
            "nomic-embed-text" => nomic_embed_text(),
            "mxbai-embed-large" => mxbai_embed_large(),
            _ => ModelConfig {
                name: model.to_string(),
                dimensions: 768,
                max_chars: 5000,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!("Gemini".parse::<EmbeddingProviderType>().unwrap(), EmbeddingProviderType::Gemini);
        assert_eq!("ollama".parse::<EmbeddingProviderType>().unwrap(), EmbeddingProviderType::Ollama);
        assert!("huggingface".parse::<EmbeddingProviderType>().is_err());
        assert_eq!(EmbeddingProviderType::default().to_string(), "gemini");
    }

    #[test]
    fn test_model_tables() {
        assert_eq!(gemini_models::get_config("text-embedding-004").dimensions, 768);
        assert_eq!(ollama_models::get_config("mxbai-embed-large").dimensions, 1024);
    }
}
