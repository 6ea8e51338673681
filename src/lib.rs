//! Green Trail - hiking trail catalog with a knowledge-base chatbot
//!
//! This crate provides the core functionality for the `gt` CLI tool.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (Trail, KnowledgeEntry, Document, chat rooms)
//! - [`storage`] - SQLite database layer
//! - [`catalog`] - Catalog writes and record-change observers
//! - [`sync`] - Debounced sync of catalog records into the vector index
//! - [`chat`] - Retrieval-augmented chatbot replies
//! - [`pipeline`] - Wiring of embedder, index, and generator
//! - [`embeddings`] - Embedding providers (Gemini, Ollama)
//! - [`vector`] - Vector index (Qdrant, in-memory)
//! - [`genai`] - Generative model client (Gemini)
//! - [`config`] - Configuration management
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod chat;
pub mod cli;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod genai;
pub mod http;
pub mod model;
pub mod pipeline;
pub mod storage;
pub mod sync;
pub mod vector;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};

/// Global silent mode flag for `--silent` output.
///
/// When set, create/mutate commands print only the ID instead of full
/// output.
pub static SILENT: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Global CSV output flag (set when `--format csv`).
pub static CSV_OUTPUT: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Check if silent mode is active.
#[inline]
pub fn is_silent() -> bool {
    SILENT.load(std::sync::atomic::Ordering::Relaxed)
}

/// Check if CSV output is requested.
#[inline]
pub fn is_csv() -> bool {
    CSV_OUTPUT.load(std::sync::atomic::Ordering::Relaxed)
}

/// Escape a value for CSV output (wrap in quotes if it contains commas, quotes, or newlines).
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::csv_escape;

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("Trilha do Pico"), "Trilha do Pico");
        assert_eq!(csv_escape("Pico, Serra"), "\"Pico, Serra\"");
        assert_eq!(csv_escape("o \"Pico\""), "\"o \"\"Pico\"\"\"");
    }
}
