//! PDF extraction: one record per physical page, zero-based page index.

use std::path::Path;

use crate::types::{AssistError, PageRecord};

use super::super::normalize::normalize;

pub fn load_pdf(path: &Path) -> Result<Vec<PageRecord>, AssistError> {
    let source = path.display().to_string();
    let document =
        lopdf::Document::load(path).map_err(|err| AssistError::ingestion(&source, err))?;

    let mut pages = Vec::new();
    for (page_number, _object_id) in document.get_pages() {
        let raw = document
            .extract_text(&[page_number])
            .map_err(|err| AssistError::ingestion(&source, err))?;
        // lopdf numbers pages from 1; records carry the zero-based index.
        pages.push(PageRecord::new(
            source.clone(),
            Some(page_number.saturating_sub(1)),
            normalize(&raw),
        ));
    }
    Ok(pages)
}
