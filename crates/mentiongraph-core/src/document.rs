use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Hex SHA-256 of a document's text. Stable across runs, which is what the
/// skip-processed cache relies on.
#[must_use]
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub doc_id: String,
    pub title: String,
    pub text: String,
    pub source_file: PathBuf,
    pub content_hash: String,
}

impl ParsedDocument {
    #[must_use]
    pub fn new(doc_id: impl Into<String>, text: impl Into<String>) -> Self {
        let doc_id = doc_id.into();
        let text = text.into();
        Self {
            title: doc_id.clone(),
            source_file: PathBuf::from(&doc_id),
            content_hash: content_hash(&text),
            doc_id,
            text,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_source_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_file = path.into();
        self
    }
}
