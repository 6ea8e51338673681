//! Embedding provider factory.

use crate::config::ResolvedConfig;
use crate::error::Result;
use crate::http::RetryPolicy;

use super::gemini::GeminiEmbeddingProvider;
use super::ollama::OllamaProvider;
use super::provider::BoxedProvider;
use super::types::EmbeddingProviderType;

/// Create the configured embedding provider.
///
/// Unlike availability checks, creation never touches the network; a
/// misconfigured provider fails on its first embedding call.
///
/// # Errors
///
/// Returns `Config` if Gemini is selected without an API key.
pub fn create_embedding_provider(config: &ResolvedConfig) -> Result<BoxedProvider> {
    let policy = RetryPolicy::from_config(config);
    match config.embedding_provider {
        EmbeddingProviderType::Gemini => Ok(BoxedProvider::new(GeminiEmbeddingProvider::new(
            &config.gemini_endpoint,
            config.require_gemini_api_key()?,
            &config.gemini_embedding_model,
            policy,
        )?)),
        EmbeddingProviderType::Ollama => Ok(BoxedProvider::new(OllamaProvider::with_config(
            &config.ollama_endpoint,
            &config.ollama_model,
            policy,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GreenTrailConfig;

    #[test]
    fn test_gemini_without_key_is_config_error() {
        let config = ResolvedConfig::from_sources(&GreenTrailConfig::default(), |_| None).unwrap();
        assert!(matches!(
            create_embedding_provider(&config),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let config = ResolvedConfig::from_sources(&GreenTrailConfig::default(), |name| {
            (name == "GT_EMBEDDING_PROVIDER").then(|| "ollama".to_string())
        })
        .unwrap();
        let provider = create_embedding_provider(&config).unwrap();
        assert_eq!(provider.info().name, "ollama");
        assert_eq!(provider.info().model, "nomic-embed-text");
    }
}
