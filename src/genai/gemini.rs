//! Gemini REST client.
//!
//! `generateContent` for text, and the Files API (resumable upload) for
//! document transcription. The API key travels as the `key` query parameter.

use super::{GenerativeModel, UploadedFile};
use crate::config::ResolvedConfig;
use crate::error::{Error, Result};
use crate::http::{build_client, send_with_retry, RetryPolicy};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;

pub struct GeminiClient {
    client: reqwest::Client,
    policy: RetryPolicy,
    transcribe_policy: RetryPolicy,
    endpoint: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a client for `model`.
    ///
    /// # Errors
    ///
    /// Returns `Config` for an empty API key, or `Http` if the client
    /// cannot be built.
    pub fn new(
        endpoint: &str,
        api_key: &str,
        model: &str,
        policy: RetryPolicy,
        transcribe_policy: RetryPolicy,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config("GEMINI_API_KEY is not set".into()));
        }
        // Per-request timeouts override this one
        let client = build_client(&transcribe_policy)?;
        Ok(Self {
            client,
            policy,
            transcribe_policy,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// Create a client from resolved settings.
    ///
    /// # Errors
    ///
    /// Returns `Config` when no API key is configured.
    pub fn from_config(config: &ResolvedConfig) -> Result<Self> {
        Self::new(
            &config.gemini_endpoint,
            config.require_gemini_api_key()?,
            &config.generation_model,
            RetryPolicy::from_config(config),
            RetryPolicy::transcription(config),
        )
    }

    fn generate_content_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    async fn generate_content(&self, body: &Value, policy: &RetryPolicy) -> Result<String> {
        let url = self.generate_content_url();
        let response = send_with_retry("gemini-generate", policy, || {
            self.client
                .post(&url)
                .timeout(policy.timeout)
                .query(&[("key", self.api_key.as_str())])
                .json(body)
        })
        .await
        .map_err(|e| Error::Generation(format!("Gemini generateContent failed: {e}")))?;

        let raw = response.text().await?;
        parse_generate_content_response(&raw)
    }
}

/// Resumable-upload URL for an API endpoint: the path gains an `/upload`
/// prefix (`https://host/v1beta` becomes `https://host/upload/v1beta/files`).
fn upload_url(endpoint: &str) -> String {
    let path_start = endpoint
        .find("://")
        .and_then(|scheme_end| {
            endpoint[scheme_end + 3..]
                .find('/')
                .map(|i| scheme_end + 3 + i)
        })
        .unwrap_or(endpoint.len());
    let (origin, path) = endpoint.split_at(path_start);
    format!("{origin}/upload{path}/files")
}

fn text_body(prompt: &str) -> Value {
    json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
    })
}

fn file_body(file: &UploadedFile, prompt: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                { "file_data": { "mime_type": file.mime_type, "file_uri": file.uri } },
                { "text": prompt }
            ]
        }]
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

fn parse_generate_content_response(raw: &str) -> Result<String> {
    let parsed: GenerateContentResponse = serde_json::from_str(raw)
        .map_err(|e| Error::Generation(format!("Failed to parse Gemini response: {e}")))?;

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(Error::Generation("Gemini returned no text".into()));
    }
    Ok(text)
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: UploadedFileResource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedFileResource {
    name: String,
    uri: String,
    mime_type: Option<String>,
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_content(&text_body(prompt), &self.policy).await
    }

    async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<UploadedFile> {
        let bytes = tokio::fs::read(path).await?;
        let display_name = path
            .file_name()
            .map_or_else(|| "document".to_string(), |n| n.to_string_lossy().into_owned());
        let policy = &self.transcribe_policy;

        // Step 1: open an upload session
        let start_url = upload_url(&self.endpoint);
        let start = send_with_retry("gemini-upload-start", policy, || {
            self.client
                .post(&start_url)
                .timeout(policy.timeout)
                .query(&[("key", self.api_key.as_str())])
                .header("X-Goog-Upload-Protocol", "resumable")
                .header("X-Goog-Upload-Command", "start")
                .header("X-Goog-Upload-Header-Content-Length", bytes.len())
                .header("X-Goog-Upload-Header-Content-Type", mime_type)
                .json(&json!({ "file": { "display_name": display_name } }))
        })
        .await
        .map_err(|e| Error::Extraction(format!("Gemini upload start failed: {e}")))?;

        let session_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| Error::Extraction("Gemini upload returned no session URL".into()))?;

        // Step 2: send the bytes and finalize
        let finished = send_with_retry("gemini-upload", policy, || {
            self.client
                .post(&session_url)
                .timeout(policy.timeout)
                .header("X-Goog-Upload-Offset", 0)
                .header("X-Goog-Upload-Command", "upload, finalize")
                .body(bytes.clone())
        })
        .await
        .map_err(|e| Error::Extraction(format!("Gemini upload failed: {e}")))?;

        let uploaded: UploadResponse = finished
            .json()
            .await
            .map_err(|e| Error::Extraction(format!("Failed to parse Gemini upload response: {e}")))?;

        Ok(UploadedFile {
            name: uploaded.file.name,
            uri: uploaded.file.uri,
            mime_type: uploaded
                .file
                .mime_type
                .unwrap_or_else(|| mime_type.to_string()),
        })
    }

    async fn generate_with_file(&self, file: &UploadedFile, prompt: &str) -> Result<String> {
        self.generate_content(&file_body(file, prompt), &self.transcribe_policy)
            .await
    }

    async fn delete_file(&self, file: &UploadedFile) -> Result<()> {
        let url = format!("{}/{}", self.endpoint, file.name);
        send_with_retry("gemini-delete-file", &self.policy, || {
            self.client
                .delete(&url)
                .timeout(self.policy.timeout)
                .query(&[("key", self.api_key.as_str())])
        })
        .await
        .map_err(|e| Error::Generation(format!("Gemini file delete failed: {e}")))?;
        Ok(())
    }
}
