//! Text scrubbing applied to every extracted page before chunking.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static BULLETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-•●▪]").expect("bullet regex"));
static COPYRIGHT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Copyright.*?\d{4}").expect("copyright regex"));
static URLS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S+|www\.\S+").expect("url regex"));

/// Cleans extracted text into a single trimmed line.
///
/// Whitespace runs (newlines, tabs, NBSP included) collapse to one ASCII
/// space, bullet glyphs are dropped outright, `Copyright…<year>` spans and
/// URLs are removed, and the result is trimmed. Total over all inputs; the
/// empty string maps to itself.
///
/// Invariant: `normalize(normalize(x)) == normalize(x)`. A removal can
/// expose a fresh match (a URL embedded mid-word, a copyright span split by
/// a link), so the pass repeats until the text stops changing.
pub fn normalize(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = normalize_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn normalize_once(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text, " ");
    let no_urls = URLS.replace_all(&collapsed, "");
    let no_copyright = COPYRIGHT.replace_all(&no_urls, "");
    let no_bullets = BULLETS.replace_all(&no_copyright, "");
    no_bullets.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn collapses_mixed_whitespace_runs() {
        let input = "one\t\ttwo\n\nthree\r\n four\u{a0}five";
        assert_eq!(normalize(input), "one two three four five");
    }

    #[test]
    fn removes_bullets_without_padding() {
        assert_eq!(normalize("feature•flag"), "featureflag");
        assert_eq!(normalize("▪ point one ● point two"), "point one point two");
    }

    #[test]
    fn strips_copyright_spans_and_urls() {
        let input = "Copyright © 2023 Acme. Visit https://example.com for more.";
        let cleaned = normalize(input);
        assert!(!cleaned.contains("Copyright"));
        assert!(!cleaned.contains("2023"));
        assert!(!cleaned.contains("example.com"));
        assert!(cleaned.contains("Visit"));
        assert!(cleaned.contains("for more."));
    }

    #[test]
    fn strips_www_urls() {
        assert_eq!(normalize("see www.example.org/docs now"), "see now");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n\t "), "");
    }

    #[test]
    fn reaches_fixed_point_on_masked_matches() {
        // The hyphen splits the word "Copyright"; dropping the glyph fuses
        // a copyright span that a single pass would miss.
        let input = "Copy-right studios 2020 shipped";
        let cleaned = normalize(input);
        assert!(!cleaned.contains("2020"));
        assert_eq!(cleaned, "shipped");
        assert_eq!(normalize(&cleaned), cleaned);
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(input in ".*") {
            let once = normalize(&input);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn output_has_no_whitespace_runs(input in ".*") {
            let cleaned = normalize(&input);
            prop_assert!(!cleaned.contains("  "));
            prop_assert!(!cleaned.contains('\n'));
            prop_assert!(!cleaned.contains('\t'));
            prop_assert_eq!(cleaned.trim(), cleaned.as_str());
        }
    }
}
