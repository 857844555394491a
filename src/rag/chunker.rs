/// One page of extracted document text, numbered from 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub number: usize,
    pub text: String,
}

impl Page {
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// Chunks are closed early once they reach this share of `chunk_size`.
const FLUSH_RATIO: f64 = 0.9;

/// Page-aware paragraph chunker.
///
/// Paragraphs (separated by blank lines) are kept whole and labeled with their
/// page, e.g. `[Page 2] Experience ...`. Sizes are estimated in tokens as
/// characters / 4.
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(1000, 200)
    }
}

impl Chunker {
    /// `chunk_overlap` is accepted for configuration compatibility; paragraphs
    /// are never split, so chunks do not overlap.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn chunk(&self, pages: &[Page]) -> Vec<String> {
        let limit = self.chunk_size as f64;
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_size = 0.0;

        for page in pages {
            for paragraph in page.text.split("\n\n") {
                let paragraph = paragraph.trim();
                if paragraph.is_empty() {
                    continue;
                }

                let size = estimate_tokens(paragraph);
                let labeled = format!("[Page {}] {}", page.number, paragraph);

                if current.is_empty() {
                    current = labeled;
                    current_size = size;
                } else if current_size + size > limit {
                    chunks.push(std::mem::replace(&mut current, labeled));
                    current_size = size;
                } else {
                    current.push_str("\n\n");
                    current.push_str(&labeled);
                    current_size += size;

                    if current_size >= limit * FLUSH_RATIO {
                        chunks.push(std::mem::take(&mut current));
                        current_size = 0.0;
                    }
                }
            }
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }
}

fn estimate_tokens(text: &str) -> f64 {
    text.chars().count() as f64 / 4.0
}

const SUMMARY_PAGES: usize = 2;
const SUMMARY_SOURCE_CHARS: usize = 1000;
const SUMMARY_WORDS: usize = 100;
const SUMMARY_MAX_CHARS: usize = 500;
const PLACEHOLDER: &str = "...";

/// Short description of a document built from its first pages.
pub fn summarize(pages: &[Page]) -> String {
    let intro = pages
        .iter()
        .take(SUMMARY_PAGES)
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let collapsed = intro.split_whitespace().collect::<Vec<_>>().join(" ");
    let head: String = collapsed.chars().take(SUMMARY_SOURCE_CHARS).collect();

    let summary = head
        .split_whitespace()
        .take(SUMMARY_WORDS)
        .collect::<Vec<_>>()
        .join(" ");

    if summary.chars().count() > SUMMARY_MAX_CHARS {
        shorten(&summary, SUMMARY_MAX_CHARS)
    } else {
        summary
    }
}

/// Drops whole words from the end until the text plus `...` fits in `width`.
fn shorten(text: &str, width: usize) -> String {
    let budget = width.saturating_sub(PLACEHOLDER.len());
    let mut out = String::new();

    for word in text.split_whitespace() {
        let separator = usize::from(!out.is_empty());
        if out.chars().count() + separator + word.chars().count() > budget {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }

    out.push_str(PLACEHOLDER);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs_are_labeled_with_page() {
        let chunker = Chunker::default();
        let pages = vec![
            Page::new(1, "Agustín Modia\n\nSoftware engineer"),
            Page::new(2, "Experience at Modia"),
        ];

        let chunks = chunker.chunk(&pages);
        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0],
            "[Page 1] Agustín Modia\n\n[Page 1] Software engineer\n\n[Page 2] Experience at Modia"
        );
    }

    #[test]
    fn test_blank_paragraphs_are_skipped() {
        let chunker = Chunker::default();
        let chunks = chunker.chunk(&[Page::new(1, "\n\n  \n\nonly one\n\n")]);
        assert_eq!(chunks, vec!["[Page 1] only one".to_string()]);
    }

    #[test]
    fn test_overflow_starts_new_chunk() {
        // 10 tokens per chunk; each paragraph is 6 tokens
        let chunker = Chunker::new(10, 0);
        let para = "a".repeat(24);
        let text = format!("{para}\n\n{para}");

        let chunks = chunker.chunk(&[Page::new(1, text)]);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.starts_with("[Page 1] ")));
    }

    #[test]
    fn test_near_full_chunk_is_flushed() {
        // 5 + 4 = 9 tokens reaches 90% of 10 and closes the chunk
        let chunker = Chunker::new(10, 0);
        let text = format!("{}\n\n{}\n\n{}", "a".repeat(20), "b".repeat(16), "c".repeat(4));

        let chunks = chunker.chunk(&[Page::new(3, text)]);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].contains("bbbb"));
        assert_eq!(chunks[1], format!("[Page 3] {}", "c".repeat(4)));
    }

    #[test]
    fn test_empty_input() {
        assert!(Chunker::default().chunk(&[]).is_empty());
    }

    #[test]
    fn test_summary_uses_first_two_pages() {
        let pages = vec![
            Page::new(1, "Agustín   Modia\nEngineer"),
            Page::new(2, "Buenos Aires"),
            Page::new(3, "never included"),
        ];

        assert_eq!(summarize(&pages), "Agustín Modia Engineer Buenos Aires");
    }

    #[test]
    fn test_summary_caps_words() {
        let text = (0..150).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let summary = summarize(&[Page::new(1, text)]);

        assert_eq!(summary.split_whitespace().count(), 100);
        assert!(summary.ends_with("w99"));
    }

    #[test]
    fn test_summary_shortens_long_words() {
        let text = vec!["abcdefghij"; 100].join(" ");
        let summary = summarize(&[Page::new(1, text)]);

        assert!(summary.chars().count() <= 500);
        assert!(summary.ends_with("abcdefghij..."));
    }
}
