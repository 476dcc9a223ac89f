//! Crate-wide error taxonomy and the transient ingestion data model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type carried through every fallible path in the crate.
#[derive(Debug, Error)]
pub enum AssistError {
    /// A single document or URL could not be loaded. Carries the offending
    /// source so partial-failure reports stay attributable.
    #[error("ingestion failed for {src}: {reason}")]
    Ingestion { src: String, reason: String },

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("completion error: {0}")]
    Completion(String),

    /// The routing model answered with something other than the two
    /// expected labels. The raw output is preserved verbatim.
    #[error("query classification failed, model returned {0:?}")]
    Classification(String),

    #[error("metrics query error: {0}")]
    Metrics(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AssistError {
    /// Shorthand for a typed ingestion error naming the failing source.
    pub fn ingestion(source: impl Into<String>, reason: impl ToString) -> Self {
        AssistError::Ingestion {
            src: source.into(),
            reason: reason.to_string(),
        }
    }
}

/// One logical page produced by a format loader.
///
/// Immutable after creation; ordering within a source is loader-determined
/// (document page order, web pages in fetch order). `title`, `description`
/// and `language` are only populated by the web loader, and only when the
/// page actually carries them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub source: String,
    pub page_number: Option<u32>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl PageRecord {
    /// A record with only the required fields set.
    pub fn new(source: impl Into<String>, page_number: Option<u32>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            page_number,
            text: text.into(),
            title: None,
            description: None,
            language: None,
        }
    }
}

/// A bounded-length piece of a page, ready for embedding.
///
/// Provenance must always equal the originating [`PageRecord`]; the chunker
/// never rewrites it. No id is assigned here; storage derives one from
/// source + page + split position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_text: String,
    pub source: String,
    pub page_number: Option<u32>,
}
