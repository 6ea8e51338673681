//! Generative model abstraction.
//!
//! Used for two things: answering chat questions from retrieved context,
//! and transcribing PDF documents into plain text.

pub mod gemini;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use tracing::warn;

pub use gemini::GeminiClient;

/// Instruction sent alongside an uploaded document.
pub const TRANSCRIBE_PROMPT: &str = "Transcribe the full text.";

/// A file held by the model provider for later prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Provider resource name, e.g. `files/abc123`.
    pub name: String,
    pub uri: String,
    pub mime_type: String,
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Generate a text reply to a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Upload a local file.
    async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<UploadedFile>;

    /// Generate a reply to a prompt about an uploaded file.
    async fn generate_with_file(&self, file: &UploadedFile, prompt: &str) -> Result<String>;

    /// Delete an uploaded file.
    async fn delete_file(&self, file: &UploadedFile) -> Result<()>;

    /// Upload a document, ask for its full text, then delete the upload.
    ///
    /// The upload is deleted even when transcription fails; a failed delete
    /// is logged and does not fail the transcription.
    async fn transcribe(&self, path: &Path, mime_type: &str) -> Result<String> {
        let file = self.upload_file(path, mime_type).await?;
        let text = self.generate_with_file(&file, TRANSCRIBE_PROMPT).await;
        if let Err(e) = self.delete_file(&file).await {
            warn!(file = %file.name, error = %e, "Failed to delete uploaded file");
        }
        text
    }
}
