//! Document ingestion: format loaders, text normalization, aggregation and
//! overlap-aware chunking.
//!
//! * [`normalize`] — whitespace/bullet/copyright/URL scrubbing.
//! * [`loaders`] — per-format extraction into [`PageRecord`]s.
//! * [`splitter`] — recursive character splitting with overlap.
//! * [`ingest`] — directory + URL aggregation into one ordered sequence.

pub mod loaders;
pub mod normalize;
pub mod splitter;

use std::path::{Path, PathBuf};

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::types::{AssistError, PageRecord};

pub use normalize::normalize as normalize_text;
pub use splitter::{DEFAULT_SEPARATORS, TextSplitter, chunk_pages};

/// Output of one ingestion run: the pages that loaded plus the sources that
/// failed. Already-processed pages are never discarded by a later failure;
/// callers that want abort-on-error semantics check [`errors`](Self::errors).
#[derive(Debug, Default)]
pub struct IngestionReport {
    pub pages: Vec<PageRecord>,
    pub errors: Vec<AssistError>,
    /// Files passed over because their extension is not accepted.
    pub skipped: Vec<PathBuf>,
}

impl IngestionReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs all extractors over a directory and a URL list.
///
/// Record order is fixed: every Word record, then every PDF record, then
/// every web record. Directory entries are sorted by file name so repeated
/// runs ingest in the same order regardless of the filesystem's listing.
/// Only an unreadable directory fails the whole call; per-source failures
/// are collected into the report.
pub async fn ingest(
    dir: &Path,
    urls: &[String],
    accepted_extensions: &[String],
    client: &Client,
) -> Result<IngestionReport, AssistError> {
    let mut report = IngestionReport::default();

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort_by_key(|path| path.file_name().map(|name| name.to_os_string()));

    let mut docx_files = Vec::new();
    let mut pdf_files = Vec::new();
    for path in files {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some(ext) if !accepted_extensions.iter().any(|a| a == ext) => {
                debug!(path = %path.display(), "skipping unsupported extension");
                report.skipped.push(path);
            }
            Some("docx") => docx_files.push(path),
            Some("pdf") => pdf_files.push(path),
            _ => {
                debug!(path = %path.display(), "skipping file without accepted extension");
                report.skipped.push(path);
            }
        }
    }

    for path in &docx_files {
        match loaders::load_docx(path) {
            Ok(pages) => report.pages.extend(pages),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "docx load failed");
                report.errors.push(err);
            }
        }
    }

    for path in &pdf_files {
        match loaders::load_pdf(path) {
            Ok(pages) => report.pages.extend(pages),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "pdf load failed");
                report.errors.push(err);
            }
        }
    }

    for url in urls {
        match loaders::load_web(client, url).await {
            Ok(page) => report.pages.push(page),
            Err(err) => {
                warn!(url = %url, error = %err, "web load failed");
                report.errors.push(err);
            }
        }
    }

    info!(
        pages = report.pages.len(),
        errors = report.errors.len(),
        skipped = report.skipped.len(),
        "ingestion complete"
    );
    Ok(report)
}
