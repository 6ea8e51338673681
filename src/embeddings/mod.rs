//! Embedding providers.
//!
//! Turns text into vectors for the knowledge index:
//! - **Gemini** (cloud, default) - `text-embedding-004`, 768 dimensions
//! - **Ollama** (local) - `nomic-embed-text`, 768 dimensions
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────┐
//! │ Sync orchestrator│   │ Chat service │
//! └────────┬─────────┘   └──────┬───────┘
//!          └────────┬───────────┘
//!                   ▼
//!          ┌─────────────────┐
//!          │  BoxedProvider  │  ← chosen by the factory
//!          └────────┬────────┘
//!              ┌────┴────┐
//!              ▼         ▼
//!          ┌──────┐  ┌──────┐
//!          │Gemini│  │Ollama│
//!          └──────┘  └──────┘
//! ```
//!
//! # Configuration
//!
//! - `GT_EMBEDDING_PROVIDER` - `gemini` or `ollama` (default: `gemini`)
//! - `GEMINI_API_KEY` / `GEMINI_EMBEDDING_MODEL`
//! - `OLLAMA_ENDPOINT` / `OLLAMA_MODEL`

pub mod factory;
pub mod gemini;
pub mod ollama;
pub mod provider;
pub mod types;

pub use factory::create_embedding_provider;
pub use gemini::GeminiEmbeddingProvider;
pub use ollama::OllamaProvider;
pub use provider::{BoxedProvider, EmbeddingProvider};
pub use types::{EmbeddingProviderType, ModelConfig, ProviderInfo};
