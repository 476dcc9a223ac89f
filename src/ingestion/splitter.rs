//! Overlap-aware recursive text splitting.
//!
//! Pages are cut on the coarsest separator that keeps pieces inside the
//! configured ceiling, falling through `"\n\n"` → `"\n"` → `" "` → `"."`
//! before resorting to fixed windows. Adjacent pieces are merged back up to
//! the ceiling and the tail of each chunk is carried into the next one so
//! context survives the cut.

use unicode_segmentation::UnicodeSegmentation;

use crate::types::{ChunkRecord, PageRecord};

/// Separator priority, coarsest first.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", "."];

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    /// Creates a splitter with the given ceiling and overlap, both counted
    /// in grapheme clusters. The overlap is clamped below the ceiling so
    /// every window makes forward progress.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Splits one text into chunks no wider than the ceiling.
    ///
    /// Text already within the ceiling comes back as a single chunk; the
    /// empty string yields no chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        self.split_with(text, &DEFAULT_SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        if width(text) <= self.chunk_size {
            return vec![text.to_string()];
        }
        let Some(position) = separators.iter().position(|sep| text.contains(sep)) else {
            return self.window_split(text);
        };
        let separator = separators[position];
        let remaining = &separators[position + 1..];
        let pieces: Vec<&str> = text
            .split(separator)
            .filter(|piece| !piece.is_empty())
            .collect();
        self.merge_pieces(&pieces, separator, remaining)
    }

    /// Greedily packs split pieces back into chunks, rejoining with the
    /// separator that produced them. Pieces still wider than the ceiling
    /// recurse with the finer separators; overlap is carried as whole
    /// trailing pieces, never partial ones.
    fn merge_pieces(&self, pieces: &[&str], separator: &str, remaining: &[&str]) -> Vec<String> {
        let sep_width = width(separator);
        let mut chunks = Vec::new();
        let mut buffer: Vec<&str> = Vec::new();
        let mut buffered = 0usize;

        for &piece in pieces {
            let piece_width = width(piece);

            if piece_width > self.chunk_size {
                self.flush(&mut chunks, &mut buffer, &mut buffered, separator);
                chunks.extend(self.split_with(piece, remaining));
                continue;
            }

            let joined = if buffer.is_empty() { 0 } else { sep_width };
            if buffered + joined + piece_width > self.chunk_size && !buffer.is_empty() {
                chunks.push(buffer.join(separator));
                // Drop from the front until what remains fits inside the
                // overlap budget alongside the incoming piece.
                while buffered > self.chunk_overlap
                    || (buffered + sep_width + piece_width > self.chunk_size && buffered > 0)
                {
                    let removed = buffer.remove(0);
                    buffered -= width(removed);
                    if !buffer.is_empty() {
                        buffered -= sep_width;
                    }
                }
            }

            if !buffer.is_empty() {
                buffered += sep_width;
            }
            buffer.push(piece);
            buffered += piece_width;
        }

        self.flush(&mut chunks, &mut buffer, &mut buffered, separator);
        chunks
    }

    fn flush(
        &self,
        chunks: &mut Vec<String>,
        buffer: &mut Vec<&str>,
        buffered: &mut usize,
        separator: &str,
    ) {
        if !buffer.is_empty() {
            chunks.push(buffer.join(separator));
            buffer.clear();
            *buffered = 0;
        }
    }

    /// Fixed windows for text with no usable separator: exact ceiling-wide
    /// slices advancing by `chunk_size - chunk_overlap` graphemes.
    fn window_split(&self, text: &str) -> Vec<String> {
        let graphemes: Vec<&str> = text.graphemes(true).collect();
        let stride = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0usize;
        loop {
            let end = (start + self.chunk_size).min(graphemes.len());
            chunks.push(graphemes[start..end].concat());
            if end == graphemes.len() {
                return chunks;
            }
            start += stride;
        }
    }
}

/// Splits every page and tags each chunk with its page's provenance.
pub fn chunk_pages(pages: &[PageRecord], splitter: &TextSplitter) -> Vec<ChunkRecord> {
    pages
        .iter()
        .flat_map(|page| {
            splitter.split(&page.text).into_iter().map(|chunk_text| ChunkRecord {
                chunk_text,
                source: page.source.clone(),
                page_number: page.page_number,
            })
        })
        .collect()
}

fn width(text: &str) -> usize {
    text.graphemes(true).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_within_ceiling_is_one_chunk() {
        let splitter = TextSplitter::new(500, 50);
        let text = "a".repeat(500);
        let chunks = splitter.split(&text);
        assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let splitter = TextSplitter::new(500, 50);
        assert!(splitter.split("").is_empty());
    }

    #[test]
    fn separator_free_text_windows_with_exact_overlap() {
        let splitter = TextSplitter::new(500, 50);
        let text: String = (0..1200).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = splitter.split(&text);

        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 500);
        }
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().skip(pair[0].chars().count() - 50).collect();
            let head: String = pair[1].chars().take(50).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn respects_ceiling_on_prose() {
        let splitter = TextSplitter::new(80, 20);
        let sentence = "liveops dashboards report daily bookings per region and platform tier";
        let text = [sentence; 12].join(" ");
        let chunks = splitter.split(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 80, "oversized chunk: {chunk:?}");
        }
    }

    #[test]
    fn prefers_paragraph_breaks_over_finer_cuts() {
        let splitter = TextSplitter::new(40, 0);
        let text = "first paragraph body\n\nsecond paragraph body";
        let chunks = splitter.split(&text);
        assert_eq!(chunks, vec!["first paragraph body", "second paragraph body"]);
    }

    #[test]
    fn prose_overlap_repeats_trailing_words() {
        let splitter = TextSplitter::new(30, 12);
        let text = "alpha beta gamma delta epsilon zeta eta theta iota";
        let chunks = splitter.split(&text);

        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let last_word = pair[0].split_whitespace().last().unwrap();
            assert!(
                pair[1].starts_with(last_word),
                "expected {:?} to start with {:?}",
                pair[1],
                last_word
            );
        }
    }

    #[test]
    fn chunk_pages_preserves_provenance() {
        let splitter = TextSplitter::new(20, 5);
        let pages = vec![
            PageRecord::new("guide.pdf", Some(3), "one two three four five six seven eight"),
            PageRecord::new("notes.docx", Some(0), "short"),
        ];
        let chunks = chunk_pages(&pages, &splitter);

        assert!(chunks.len() > 2);
        for chunk in &chunks {
            let expected_page = if chunk.source == "guide.pdf" { Some(3) } else { Some(0) };
            assert_eq!(chunk.page_number, expected_page);
        }
        assert_eq!(chunks.last().unwrap().chunk_text, "short");
        assert_eq!(chunks.last().unwrap().source, "notes.docx");
    }
}
