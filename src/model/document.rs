//! Document model.
//!
//! Uploaded files (PDFs, plain text) whose text feeds the knowledge base.
//! The `processed` flag flips to true once the file's text has been
//! embedded and upserted.

use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Media type for PDF documents.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub file_path: String,
    /// Declared media type, e.g. `application/pdf` or `text/plain`.
    pub media_type: Option<String>,
    /// Key of this document's point in the vector index, assigned on first sync.
    pub external_index_id: Option<Uuid>,
    pub processed: bool,
    pub uploaded_at: i64,
}

impl Document {
    /// Declared media type, falling back to a guess from the file extension.
    #[must_use]
    pub fn effective_media_type(&self) -> Option<String> {
        self.media_type
            .clone()
            .or_else(|| guess_media_type(Path::new(&self.file_path)).map(str::to_string))
    }
}

/// Guess a media type from a file extension.
#[must_use]
pub fn guess_media_type(path: &Path) -> Option<&'static str> {
    mime_guess::from_path(path).first_raw()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(path: &str, media_type: Option<&str>) -> Document {
        Document {
            id: 1,
            title: "Mapa".to_string(),
            file_path: path.to_string(),
            media_type: media_type.map(str::to_string),
            external_index_id: None,
            processed: false,
            uploaded_at: 0,
        }
    }

    #[test]
    fn test_guess_media_type() {
        assert_eq!(guess_media_type(Path::new("a/b.PDF")), Some("application/pdf"));
        assert_eq!(guess_media_type(Path::new("notes.txt")), Some("text/plain"));
        assert_eq!(guess_media_type(Path::new("photo.png")), Some("image/png"));
        assert_eq!(
            guess_media_type(Path::new("distancias.tsv")),
            Some("text/tab-separated-values")
        );
        assert_eq!(guess_media_type(Path::new("estilo.css")), Some("text/css"));
        assert_eq!(guess_media_type(Path::new("archive.zzqq")), None);
        assert_eq!(guess_media_type(Path::new("no_extension")), None);
    }

    #[test]
    fn test_declared_media_type_wins() {
        let doc = document("scan.bin", Some("application/pdf"));
        assert_eq!(doc.effective_media_type().as_deref(), Some("application/pdf"));

        let doc = document("guide.txt", None);
        assert_eq!(doc.effective_media_type().as_deref(), Some("text/plain"));
    }
}
