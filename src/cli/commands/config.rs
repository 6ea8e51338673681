//! Config command implementations.

use crate::cli::ConfigCommands;
use crate::config::{config_path, ResolvedConfig};
use crate::error::Result;

/// Execute config commands.
pub fn execute(command: &ConfigCommands, json: bool) -> Result<()> {
    match command {
        ConfigCommands::Show => show(json),
    }
}

fn show(json: bool) -> Result<()> {
    let config = ResolvedConfig::resolve()?;
    let path = config_path()?;
    let set = |key: &Option<String>| key.is_some();

    if json {
        let output = serde_json::json!({
            "config_file": path,
            "config_file_exists": path.exists(),
            "settings": config,
            "gemini_api_key_set": set(&config.gemini_api_key),
            "qdrant_api_key_set": set(&config.qdrant_api_key),
        });
        println!("{output}");
        return Ok(());
    }

    let secret = |key: &Option<String>| if set(key) { "set" } else { "not set" };
    let exists = if path.exists() { "" } else { " (not found, using defaults)" };

    println!("Config file: {}{exists}", path.display());
    println!();
    println!("Embeddings:");
    println!("  Provider:        {}", config.embedding_provider);
    println!("  Gemini model:    {}", config.gemini_embedding_model);
    println!("  Ollama:          {} ({})", config.ollama_endpoint, config.ollama_model);
    println!("  Vector size:     {}", config.vector_size);
    println!("Generation:");
    println!("  Model:           {}", config.generation_model);
    println!("  Endpoint:        {}", config.gemini_endpoint);
    println!("  API key:         {}", secret(&config.gemini_api_key));
    println!("Vector index:");
    println!("  URL:             {}", config.qdrant_url);
    println!("  Collection:      {}", config.collection);
    println!("  API key:         {}", secret(&config.qdrant_api_key));
    println!("Sync:");
    println!("  Enabled:         {}", config.sync_enabled);
    println!("  Delay:           {}s", config.sync_delay_secs);
    println!("HTTP:");
    println!("  Timeout:         {}s", config.http_timeout_secs);
    println!("  Transcription:   {}s", config.transcribe_timeout_secs);
    println!("  Max retries:     {}", config.http_max_retries);
    Ok(())
}
