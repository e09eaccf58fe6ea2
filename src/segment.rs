//! Splitting raw writing into retrieval-sized chunks.
//!
//! Paragraphs are separated by blank lines. Each paragraph is split into
//! sentences after `.`, `!` or `?` followed by whitespace, and consecutive
//! sentences are grouped `max_sentences` at a time.

use once_cell::sync::Lazy;
use regex::Regex;

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t\r]*\n").expect("valid regex"));
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Sentences per chunk used by the archive builder.
pub const DEFAULT_MAX_SENTENCES: usize = 3;

/// A segmented chunk with its sequential id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub id: u64,
    pub text: String,
}

/// Segment `text` into chunks of at most `max_sentences` sentences.
///
/// Ids are assigned in document order starting at 0. A `max_sentences` of 0 is
/// treated as 1.
pub fn segment_text(text: &str, max_sentences: usize) -> Vec<Segment> {
    let max_sentences = max_sentences.max(1);

    PARAGRAPH_BREAK
        .split(text)
        .map(|p| WHITESPACE.replace_all(p.trim(), " ").into_owned())
        .filter(|p| !p.is_empty())
        .flat_map(|paragraph| {
            split_sentences(&paragraph)
                .chunks(max_sentences)
                .map(|group| group.join(" ").trim().to_string())
                .filter(|chunk| !chunk.is_empty())
                .collect::<Vec<_>>()
        })
        .enumerate()
        .map(|(i, text)| Segment { id: i as u64, text })
        .collect()
}

fn split_sentences(paragraph: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for boundary in SENTENCE_END.find_iter(paragraph) {
        // keep the punctuation, drop the whitespace
        let end = boundary.start() + 1;
        sentences.push(paragraph[start..end].trim().to_string());
        start = boundary.end();
    }
    let tail = paragraph[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_sentences_per_paragraph() {
        let text = "One. Two! Three? Four.\nFive.\n\n\nSix is alone";
        let segments = segment_text(text, 3);
        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["One. Two! Three?", "Four. Five.", "Six is alone"]);
        assert_eq!(segments.iter().map(|s| s.id).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_blank_input_yields_nothing() {
        assert!(segment_text("  \n\n \n", 3).is_empty());
    }

    #[test]
    fn test_decimal_points_do_not_split() {
        let segments = segment_text("Growth was 3.5 percent. Then it fell.", 1);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Growth was 3.5 percent.");
    }
}
