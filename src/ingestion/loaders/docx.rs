//! Word document extraction.
//!
//! A `.docx` file is a zip archive; the visible text lives in
//! `word/document.xml` as `<w:t>` runs grouped into `<w:p>` paragraphs.
//! The loader does not track page numbers for this format, so the whole
//! document becomes one record with page 0.

use std::io::Read;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::super::normalize::normalize;
use crate::types::{AssistError, PageRecord};

static TEXT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<w:t[^>]*>([^<]*)</w:t>").expect("text run regex"));

pub fn load_docx(path: &Path) -> Result<Vec<PageRecord>, AssistError> {
    let source = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|err| AssistError::ingestion(&source, err))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|err| AssistError::ingestion(&source, err))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|err| AssistError::ingestion(&source, err))?
        .read_to_string(&mut xml)
        .map_err(|err| AssistError::ingestion(&source, err))?;

    let text = document_xml_to_text(&xml);
    Ok(vec![PageRecord::new(source, Some(0), normalize(&text))])
}

/// Collects `<w:t>` run contents, one line per `<w:p>` paragraph.
pub fn document_xml_to_text(xml: &str) -> String {
    let mut paragraphs = Vec::new();
    for paragraph in xml.split("</w:p>") {
        let mut buf = String::new();
        for capture in TEXT_RUN.captures_iter(paragraph) {
            buf.push_str(&capture[1]);
        }
        let decoded = decode_entities(&buf);
        if !decoded.trim().is_empty() {
            paragraphs.push(decoded);
        }
    }
    paragraphs.join("\n")
}

fn decode_entities(text: &str) -> String {
    // &amp; last so double-escaped entities stay literal.
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_runs_per_paragraph() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Season roadmap</w:t></w:r></w:p>
            <w:p><w:r><w:t xml:space="preserve">Battle </w:t></w:r><w:r><w:t>pass tiers</w:t></w:r></w:p>
        </w:body></w:document>"#;
        assert_eq!(document_xml_to_text(xml), "Season roadmap\nBattle pass tiers");
    }

    #[test]
    fn decodes_basic_entities() {
        let xml = "<w:p><w:t>Tier 1 &amp; Tier 2 &lt;beta&gt;</w:t></w:p>";
        assert_eq!(document_xml_to_text(xml), "Tier 1 & Tier 2 <beta>");
    }

    #[test]
    fn skips_empty_paragraphs() {
        let xml = "<w:p><w:t>alpha</w:t></w:p><w:p></w:p><w:p><w:t>beta</w:t></w:p>";
        assert_eq!(document_xml_to_text(xml), "alpha\nbeta");
    }

    #[test]
    fn missing_file_is_a_typed_ingestion_error() {
        let err = load_docx(Path::new("/definitely/not/here.docx")).unwrap_err();
        match err {
            AssistError::Ingestion { src: source, .. } => {
                assert!(source.contains("here.docx"));
            }
            other => panic!("expected ingestion error, got {other:?}"),
        }
    }
}
