//! Text extraction for syncable records.
//!
//! Each record kind renders to the text that gets embedded, plus a short
//! source label stored beside it in the index.

use crate::error::{Error, Result};
use crate::genai::GenerativeModel;
use crate::model::{Document, SyncableRecord, Trail, PDF_MEDIA_TYPE};
use std::path::Path;

/// Longest prefix of a text sent to the embedding model, in characters.
pub const MAX_EMBED_CHARS: usize = 9000;

/// Text extracted from a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub text: String,
    /// e.g. `Track: Trilha do Pico`.
    pub source: String,
}

/// Extract a record's text.
///
/// Returns `Ok(None)` when the record has nothing to index: blank text, or
/// a document whose media type is neither PDF nor `text/*`.
///
/// # Errors
///
/// Returns `Extraction` if a document cannot be read or transcribed.
pub async fn extract(
    record: &SyncableRecord,
    generator: Option<&dyn GenerativeModel>,
) -> Result<Option<Extracted>> {
    let extracted = match record {
        SyncableRecord::Trail(trail) => Extracted {
            text: trail_text(trail),
            source: format!("Track: {}", trail.label),
        },
        SyncableRecord::Knowledge(entry) => Extracted {
            text: entry.content.clone(),
            source: format!("Knowledge: {}", entry.title),
        },
        SyncableRecord::Document(document) => match document_text(document, generator).await? {
            Some(text) => Extracted {
                text,
                source: format!("Document: {}", document.title),
            },
            None => return Ok(None),
        },
    };

    if extracted.text.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(extracted))
}

/// Render a trail as plain sentences.
///
/// Zero and missing measurements both read as unknown.
#[must_use]
pub fn trail_text(trail: &Trail) -> String {
    let distance = trail
        .distance
        .filter(|d| *d != 0.0)
        .map_or_else(|| "Unknown distance".to_string(), |d| format!("{d} meters"));
    let duration = trail
        .duration
        .filter(|m| *m != 0)
        .map_or_else(|| "Unknown duration".to_string(), |m| format!("{m} minutes"));
    let elevation = trail
        .elevation
        .filter(|e| *e != 0.0)
        .map_or_else(|| "Unknown elevation".to_string(), |e| format!("{e} meters"));

    format!(
        "Hiking Trail Name: {}.\n\
         Difficulty Level: {}.\n\
         Route Type: {}.\n\
         Total Distance: {distance}.\n\
         Estimated Duration: {duration}.\n\
         Elevation Gain: {elevation}.\n\
         Description: {}",
        trail.label,
        trail.difficulty.label(),
        trail.route_type.label(),
        trail.description,
    )
}

async fn document_text(
    document: &Document,
    generator: Option<&dyn GenerativeModel>,
) -> Result<Option<String>> {
    let path = Path::new(&document.file_path);
    match document.effective_media_type().as_deref() {
        Some(PDF_MEDIA_TYPE) => {
            let generator = generator.ok_or_else(|| {
                Error::Extraction("PDF transcription needs a generative model (GEMINI_API_KEY)".into())
            })?;
            let text = generator
                .transcribe(path, PDF_MEDIA_TYPE)
                .await
                .map_err(|e| Error::Extraction(format!("{}: {e}", document.file_path)))?;
            Ok(Some(text))
        }
        Some(media_type) if media_type.starts_with("text/") => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| Error::Extraction(format!("{}: {e}", document.file_path)))?;
            let text = String::from_utf8(bytes).map_err(|_| {
                Error::Extraction(format!("{} is not valid UTF-8", document.file_path))
            })?;
            Ok(Some(text))
        }
        _ => Ok(None),
    }
}

/// The first `max` characters of `text`, cut on a char boundary.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
