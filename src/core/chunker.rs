//! Sentence-aware splitting of long text into provider-sized chunks

use tracing::debug;

use crate::core::models::Chunk;

/// Default sentence delimiter
pub const DEFAULT_DELIMITER: &str = ". ";

/// Splits text into chunks no longer than `max_chunk_size` characters
#[derive(Debug, Clone)]
pub struct TextSplitter {
    max_chunk_size: usize,
    delimiter: String,
}

impl TextSplitter {
    /// A zero size is raised to 1; an empty delimiter disables sentence splitting
    pub fn new(max_chunk_size: usize, delimiter: impl Into<String>) -> Self {
        Self {
            max_chunk_size: max_chunk_size.max(1),
            delimiter: delimiter.into(),
        }
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Split `text` into ordered chunks whose concatenation is `text`
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let max = self.max_chunk_size;
        if char_len(text) <= max {
            return vec![Chunk {
                index: 0,
                text: text.to_string(),
                trailing: String::new(),
            }];
        }

        let mut pieces = Vec::new();
        for unit in self.sentence_units(text) {
            if char_len(unit) <= max {
                pieces.push(unit);
            } else {
                pieces.extend(hard_split(unit, max));
            }
        }

        let mut packer = Packer::new(max);
        for piece in pieces {
            packer.push(piece);
        }
        let chunks = packer.finish();

        debug!(
            "Split {} chars into {} chunk(s) of at most {}",
            char_len(text),
            chunks.len(),
            max
        );
        chunks
    }

    /// Sentences with their delimiter still attached
    fn sentence_units<'t>(&self, text: &'t str) -> Vec<&'t str> {
        if self.delimiter.is_empty() {
            return vec![text];
        }
        text.split_inclusive(self.delimiter.as_str()).collect()
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(800, DEFAULT_DELIMITER)
    }
}

/// Greedy accumulation of consecutive pieces into chunks
struct Packer {
    max: usize,
    current: String,
    current_len: usize,
    /// Whitespace seen before the first chunk with content
    leading: String,
    chunks: Vec<Chunk>,
}

impl Packer {
    fn new(max: usize) -> Self {
        Self {
            max,
            current: String::new(),
            current_len: 0,
            leading: String::new(),
            chunks: Vec::new(),
        }
    }

    fn push(&mut self, piece: &str) {
        let len = char_len(piece);
        if self.current_len + len > self.max && !self.current.is_empty() {
            self.flush();
        }
        self.current.push_str(piece);
        self.current_len += len;
    }

    fn flush(&mut self) {
        let content = std::mem::take(&mut self.current);
        self.current_len = 0;

        // Whitespace-only runs never become chunks of their own
        if content.trim().is_empty() {
            match self.chunks.last_mut() {
                Some(previous) => previous.trailing.push_str(&content),
                None => self.leading.push_str(&content),
            }
            return;
        }

        let body_len = content.trim_end().len();
        let (body, trailing) = content.split_at(body_len);
        let mut text = std::mem::take(&mut self.leading);
        text.push_str(body);
        self.chunks.push(Chunk {
            index: self.chunks.len(),
            text,
            trailing: trailing.to_string(),
        });
    }

    fn finish(mut self) -> Vec<Chunk> {
        if !self.current.is_empty() {
            self.flush();
        }
        if self.chunks.is_empty() && !self.leading.is_empty() {
            // Blank input still round-trips
            self.chunks.push(Chunk {
                index: 0,
                text: String::new(),
                trailing: std::mem::take(&mut self.leading),
            });
        }
        self.chunks
    }
}

/// Cut an oversized unit at the last whitespace inside each budget, or at the budget itself
fn hard_split(unit: &str, max: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = unit;

    while char_len(rest) > max {
        let limit = rest
            .char_indices()
            .nth(max)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let window = &rest[..limit];

        let cut = window
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(limit);

        let (head, tail) = rest.split_at(cut);
        pieces.push(head);
        rest = tail;
    }

    if !rest.is_empty() {
        pieces.push(rest);
    }
    pieces
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_well_formed(text: &str, chunks: &[Chunk], max: usize) {
        assert_eq!(Chunk::concat(chunks), text, "chunks must reconstruct the input");
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            let len = char_len(chunk.text.trim());
            assert!(len <= max, "chunk {} has {} chars (max {})", i, len, max);
            if !text.trim().is_empty() {
                assert!(!chunk.text.trim().is_empty(), "chunk {} has no content", i);
            }
        }
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let splitter = TextSplitter::new(100, ". ");
        let chunks = splitter.split("Hello world. ");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello world. ");
        assert!(chunks[0].trailing.is_empty());
    }

    #[test]
    fn test_2500_chars_without_periods() {
        let text = "word ".repeat(500);
        let splitter = TextSplitter::new(1000, ". ");
        let chunks = splitter.split(&text);

        assert_eq!(chunks.len(), 3);
        assert_well_formed(&text, &chunks, 1000);

        let solid = "a".repeat(2500);
        let chunks = splitter.split(&solid);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text.len(), 1000);
        assert_eq!(chunks[2].text.len(), 500);
        assert_well_formed(&solid, &chunks, 1000);
    }

    #[test]
    fn test_sentences_are_packed_greedily() {
        let text = "One two. Three four. Five six. Seven eight.";
        let splitter = TextSplitter::new(22, ". ");
        let chunks = splitter.split(text);

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["One two. Three four.", "Five six. Seven eight."]);
        assert_eq!(chunks[0].trailing, " ");
        assert_well_formed(text, &chunks, 22);
    }

    #[test]
    fn test_oversized_sentence_is_hard_split() {
        let long = "x".repeat(45);
        let text = format!("Short one. {}. Tail.", long);
        let splitter = TextSplitter::new(20, ". ");
        let chunks = splitter.split(&text);

        assert!(chunks.len() >= 4);
        assert_eq!(chunks[0].text, "Short one.");
        assert_well_formed(&text, &chunks, 20);
    }

    #[test]
    fn test_multibyte_text_is_split_on_char_boundaries() {
        let text = "日本語のテキストです。".repeat(30);
        let splitter = TextSplitter::new(50, "。");
        let chunks = splitter.split(&text);

        assert_eq!(chunks.len(), 8);
        assert_well_formed(&text, &chunks, 50);
    }

    #[test]
    fn test_paragraph_breaks_survive_as_trailing() {
        let text = format!("{}.\n\n{}.", "a".repeat(30), "b".repeat(30));
        let splitter = TextSplitter::new(40, ".\n\n");
        let chunks = splitter.split(&text);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].trailing, "\n\n");
        assert_eq!(chunks[0].joiner(), "\n\n");
        assert_well_formed(&text, &chunks, 40);
    }

    #[test]
    fn test_split_is_lossless_across_sizes() {
        let inputs = [
            "The quick brown fox jumps over the lazy dog. ".repeat(40),
            "Lorem ipsum dolor sit amet, consectetur adipiscing elit. Sed do eiusmod. ".repeat(25),
            "no-delimiters-here-at-all".repeat(60),
            "  leading space. Mixed\nlines. And\ttabs.   ".repeat(30),
            "Ünïcödé séntence. ".repeat(50),
        ];

        for text in &inputs {
            for max in [1, 2, 7, 50, 128, 333, 1000, 5000] {
                let chunks = TextSplitter::new(max, ". ").split(text);
                assert_well_formed(text, &chunks, max);
            }
        }
    }

    #[test]
    fn test_empty_delimiter_falls_back_to_hard_split() {
        let text = "abc def ghi jkl";
        let chunks = TextSplitter::new(8, "").split(text);
        assert_well_formed(text, &chunks, 8);
        assert_eq!(chunks[0].text, "abc def");
    }

    #[test]
    fn test_whitespace_runs_fold_into_neighbours() {
        let text = "      abcdefgh";
        let chunks = TextSplitter::new(5, ". ").split(text);

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.trim()).collect();
        assert_eq!(texts, vec!["abcde", "fgh"]);
        assert_well_formed(text, &chunks, 5);

        let text = "abcde          fgh. ij";
        let chunks = TextSplitter::new(5, ". ").split(text);
        assert_eq!(chunks[0].text, "abcde");
        assert_eq!(chunks[0].trailing, " ".repeat(10));
        assert_well_formed(text, &chunks, 5);
    }

    #[test]
    fn test_blank_input_round_trips() {
        let text = " ".repeat(20);
        let chunks = TextSplitter::new(5, ". ").split(&text);
        assert_eq!(chunks.len(), 1);
        assert_well_formed(&text, &chunks, 5);
    }
}
