//! Error types for the Green Trail CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, etc.)
//! - Retryability flags for scripted callers
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use thiserror::Error;

/// Result type alias for Green Trail operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    AlreadyInitialized,
    DatabaseError,

    // Not Found (exit 3)
    TrailNotFound,
    KnowledgeNotFound,
    DocumentNotFound,

    // Validation (exit 4)
    InvalidArgument,

    // Extraction (exit 5)
    ExtractionError,

    // Remote services (exit 6)
    EmbeddingError,
    VectorIndexError,
    GenerationError,
    HttpError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::TrailNotFound => "TRAIL_NOT_FOUND",
            Self::KnowledgeNotFound => "KNOWLEDGE_NOT_FOUND",
            Self::DocumentNotFound => "DOCUMENT_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::ExtractionError => "EXTRACTION_ERROR",
            Self::EmbeddingError => "EMBEDDING_ERROR",
            Self::VectorIndexError => "VECTOR_INDEX_ERROR",
            Self::GenerationError => "GENERATION_ERROR",
            Self::HttpError => "HTTP_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::AlreadyInitialized | Self::DatabaseError => 2,
            Self::TrailNotFound | Self::KnowledgeNotFound | Self::DocumentNotFound => 3,
            Self::InvalidArgument => 4,
            Self::ExtractionError => 5,
            Self::EmbeddingError
            | Self::VectorIndexError
            | Self::GenerationError
            | Self::HttpError => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether the same call may succeed if simply repeated later.
    ///
    /// True for remote-service failures (the service may come back)
    /// and busy databases. False for not-found and validation errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::EmbeddingError
                | Self::VectorIndexError
                | Self::GenerationError
                | Self::HttpError
                | Self::DatabaseError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in Green Trail operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `gt init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: std::path::PathBuf },

    #[error("Trail not found: {id}")]
    TrailNotFound { id: i64 },

    #[error("Knowledge entry not found: {id}")]
    KnowledgeNotFound { id: i64 },

    #[error("Document not found: {id}")]
    DocumentNotFound { id: i64 },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    VectorIndex(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::TrailNotFound { .. } => ErrorCode::TrailNotFound,
            Self::KnowledgeNotFound { .. } => ErrorCode::KnowledgeNotFound,
            Self::DocumentNotFound { .. } => ErrorCode::DocumentNotFound,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Extraction(_) => ErrorCode::ExtractionError,
            Self::Embedding(_) => ErrorCode::EmbeddingError,
            Self::VectorIndex(_) => ErrorCode::VectorIndexError,
            Self::Generation(_) => ErrorCode::GenerationError,
            Self::Http(_) => ErrorCode::HttpError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => Some("Run `gt init` to create the database".to_string()),
            Self::AlreadyInitialized { .. } => {
                Some("Use `gt init --force` to recreate the database".to_string())
            }

            Self::TrailNotFound { .. } => {
                Some("Use `gt trail list` to see available trails.".to_string())
            }
            Self::KnowledgeNotFound { .. } => {
                Some("Use `gt knowledge list` to see knowledge entries.".to_string())
            }
            Self::DocumentNotFound { .. } => {
                Some("Use `gt document list` to see uploaded documents.".to_string())
            }

            Self::InvalidArgument(msg) => {
                if msg.contains("difficulty") {
                    Some("Valid difficulties: facil, moderado, dificil".to_string())
                } else if msg.contains("route") {
                    Some("Valid route types: ida_volta, ida, volta".to_string())
                } else if msg.contains("kind") {
                    Some("Valid kinds: trail, knowledge, document".to_string())
                } else {
                    None
                }
            }

            Self::Config(msg) if msg.contains("GEMINI_API_KEY") => Some(
                "Export GEMINI_API_KEY or set `generation.api_key` in ~/.greentrail/config.json"
                    .to_string(),
            ),

            Self::VectorIndex(_) => Some(
                "Check that Qdrant is reachable (QDRANT_URL, default http://localhost:6333)"
                    .to_string(),
            ),

            Self::Embedding(_) => Some(
                "Check the embedding provider (GT_EMBEDDING_PROVIDER, GEMINI_API_KEY or OLLAMA_ENDPOINT)"
                    .to_string(),
            ),

            Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Http(_)
            | Self::Config(_)
            | Self::Extraction(_)
            | Self::Generation(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
