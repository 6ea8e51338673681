//! Version command implementation.
//!
//! Besides the build, reports which collection and models this install
//! talks to. A config that fails to resolve only drops those fields.

use crate::config::ResolvedConfig;
use crate::error::Result;
use serde::Serialize;

#[derive(Serialize)]
struct VersionOutput<'a> {
    version: &'a str,
    build: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    collection: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    embedding_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    embedding_model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_model: Option<&'a str>,
}

/// Execute the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    let build = if cfg!(debug_assertions) {
        "dev"
    } else {
        "release"
    };
    let config = ResolvedConfig::resolve().ok();

    if json {
        let output = VersionOutput {
            version,
            build,
            collection: config.as_ref().map(|c| c.collection.as_str()),
            embedding_provider: config.as_ref().map(|c| c.embedding_provider.to_string()),
            embedding_model: config.as_ref().map(ResolvedConfig::embedding_model),
            generation_model: config.as_ref().map(|c| c.generation_model.as_str()),
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("gt version {version} ({build})");
    if let Some(config) = &config {
        println!("  collection:  {}", config.collection);
        println!(
            "  embeddings:  {} ({}, {} dims)",
            config.embedding_provider,
            config.embedding_model(),
            config.vector_size
        );
        println!("  generation:  {}", config.generation_model);
    }
    Ok(())
}
