//! Web page extraction.
//!
//! Fetches a URL and walks the parsed DOM for visible text, skipping the
//! element kinds that never carry documentation content. Title, meta
//! description and document language ride along when the page has them.

use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::super::normalize::normalize;
use crate::types::{AssistError, PageRecord};

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("title selector"));
static DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="description"]"#).expect("description selector"));
static HTML_ROOT: Lazy<Selector> = Lazy::new(|| Selector::parse("html").expect("html selector"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("body selector"));

const SKIPPED_TAGS: [&str; 6] = ["script", "style", "noscript", "template", "svg", "head"];

pub async fn load_web(client: &Client, url: &str) -> Result<PageRecord, AssistError> {
    let parsed = Url::parse(url).map_err(|err| AssistError::ingestion(url, err))?;
    let response = client
        .get(parsed)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|err| AssistError::ingestion(url, err))?;
    let body = response
        .text()
        .await
        .map_err(|err| AssistError::ingestion(url, err))?;
    Ok(page_from_html(url, &body))
}

/// Builds the page record from raw HTML. Missing metadata stays absent
/// rather than failing the page.
pub fn page_from_html(source: &str, html: &str) -> PageRecord {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty());
    let description = document
        .select(&DESCRIPTION)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|text| !text.is_empty());
    let language = document
        .select(&HTML_ROOT)
        .next()
        .and_then(|el| el.value().attr("lang"))
        .map(|lang| lang.to_string())
        .filter(|text| !text.is_empty());

    let mut raw = String::new();
    if let Some(body) = document.select(&BODY).next() {
        collect_text(body, &mut raw);
    }

    let mut record = PageRecord::new(source, Some(0), normalize(&raw));
    record.title = title;
    record.description = description;
    record.language = language;
    record
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            continue;
        }
        if let Some(child_element) = ElementRef::wrap(child) {
            if SKIPPED_TAGS.contains(&child_element.value().name()) {
                continue;
            }
            collect_text(child_element, out);
            // Element boundaries separate words; the normalizer collapses
            // the extra spacing.
            out.push(' ');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <title>KPI Glossary</title>
  <meta name="description" content="Definitions for liveops reporting.">
  <script>var tracked = true;</script>
</head>
<body>
  <h1>Glossary</h1>
  <p>DAU counts users active on a given day.</p>
  <script>console.log("never text");</script>
  <p>Bookings track gross revenue.</p>
</body>
</html>"#;

    #[test]
    fn captures_metadata_when_present() {
        let record = page_from_html("https://example.com/glossary", SAMPLE);
        assert_eq!(record.title.as_deref(), Some("KPI Glossary"));
        assert_eq!(
            record.description.as_deref(),
            Some("Definitions for liveops reporting.")
        );
        assert_eq!(record.language.as_deref(), Some("en"));
        assert_eq!(record.page_number, Some(0));
    }

    #[test]
    fn extracts_visible_text_only() {
        let record = page_from_html("https://example.com/glossary", SAMPLE);
        assert!(record.text.contains("DAU counts users"));
        assert!(record.text.contains("Bookings track gross revenue."));
        assert!(!record.text.contains("tracked"));
        assert!(!record.text.contains("never text"));
    }

    #[test]
    fn missing_metadata_stays_absent() {
        let record = page_from_html("https://example.com/bare", "<html><body><p>hi</p></body></html>");
        assert_eq!(record.title, None);
        assert_eq!(record.description, None);
        assert_eq!(record.language, None);
        assert_eq!(record.text, "hi");
    }
}
