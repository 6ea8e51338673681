//! Knowledge entry model.
//!
//! Static text entered by an administrator for the chatbot to answer from.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of a knowledge entry or document title.
pub const MAX_TITLE_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// Key of this entry's point in the vector index, assigned on first sync.
    pub external_index_id: Option<Uuid>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Check a title is present and within [`MAX_TITLE_LEN`].
///
/// # Errors
///
/// Returns `InvalidArgument` naming `what` on failure.
pub fn validate_title(title: &str, what: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{what} title is required")));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(Error::InvalidArgument(format!(
            "{what} title exceeds {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_title() {
        assert!(validate_title("Horários do parque", "knowledge").is_ok());
        assert!(validate_title("   ", "knowledge").is_err());

        let err = validate_title(&"t".repeat(MAX_TITLE_LEN + 1), "document").unwrap_err();
        assert!(err.to_string().contains("document title exceeds"));
    }
}
