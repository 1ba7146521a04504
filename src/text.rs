//! Text preparation for TTS input.
//!
//! An abbreviation table, the numbers zero to twenty,
//! a handful of symbols, and a greedy sentence chunker that keeps every
//! segment under the model's input limit.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::{Error, Result};

/// Default maximum characters per chunk handed to the model.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 500;

/// Texts longer than this are accepted but logged as worth splitting up.
const LONG_TEXT_WARN_CHARS: usize = 5_000;

/// Shortest accepted input, in trimmed characters.
const MIN_TEXT_CHARS: usize = 3;

// ─────────────────────────────────────────────────────────────────────────────
// Tables
// ─────────────────────────────────────────────────────────────────────────────

const NUMBER_WORDS: [&str; 21] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
    "ten", "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen",
    "seventeen", "eighteen", "nineteen", "twenty",
];

const ABBREVIATIONS: &[(&str, &str)] = &[
    ("dr.", "doctor"),
    ("mr.", "mister"),
    ("mrs.", "misses"),
    ("ms.", "miss"),
    ("prof.", "professor"),
    ("st.", "street"),
    ("ave.", "avenue"),
    ("blvd.", "boulevard"),
    ("etc.", "etcetera"),
    ("vs.", "versus"),
    ("e.g.", "for example"),
    ("i.e.", "that is"),
];

const SYMBOLS: &[(char, &str)] = &[
    ('&', " and "),
    ('@', " at "),
    ('#', " hash "),
    ('$', " dollar "),
    ('%', " percent "),
    ('+', " plus "),
    ('=', " equals "),
    ('<', " less than "),
    ('>', " greater than "),
    ('|', " or "),
];

// ─────────────────────────────────────────────────────────────────────────────
// Compiled regexes
// ─────────────────────────────────────────────────────────────────────────────

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s.,!?\-']").unwrap());
static RE_SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"([.!?]+)\s+").unwrap());
static RE_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d").unwrap());
static RE_SPECIAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

/// Abbreviations anchored at a word start so `st.` never matches inside `first.`.
static RE_ABBREVIATIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    ABBREVIATIONS
        .iter()
        .map(|(abbr, expansion)| {
            let re = Regex::new(&format!(r"\b{}", regex::escape(abbr))).unwrap();
            (re, *expansion)
        })
        .collect()
});

// ─────────────────────────────────────────────────────────────────────────────
// Free helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Spoken form of `n` for 0..=20, `None` beyond the table.
pub fn number_to_words(n: u32) -> Option<&'static str> {
    NUMBER_WORDS.get(n as usize).copied()
}

fn collapse_whitespace(text: &str) -> String {
    RE_SPACES.replace_all(text.trim(), " ").into_owned()
}

/// Replace a bare 0..=20 token with its word, keeping surrounding punctuation.
fn expand_number_token(word: &str) -> Option<String> {
    let core = word.trim_matches(|c: char| c.is_ascii_punctuation());
    if core.is_empty() || !core.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u32 = core.parse().ok()?;
    // "05" is not a table key, only canonical spellings are
    if n.to_string() != core {
        return None;
    }
    let spoken = number_to_words(n)?;
    let start = word.find(core)?;
    let prefix = &word[..start];
    let suffix = &word[start + core.len()..];
    Some(format!("{prefix}{spoken}{suffix}"))
}

fn expand_symbols(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match SYMBOLS.iter().find(|(sym, _)| *sym == c) {
            Some((_, word)) => out.push_str(word),
            None => out.push(c),
        }
    }
    out
}

/// Split one over-long sentence into word-wrapped pieces of at most `max_len`
/// characters. A single word longer than `max_len` is kept whole.
fn wrap_words(sentence: &str, max_len: usize) -> Vec<String> {
    if sentence.chars().count() <= max_len {
        return vec![sentence.to_string()];
    }
    let mut pieces = Vec::new();
    let mut current = String::new();
    for word in sentence.split_whitespace() {
        let needed = current.chars().count() + 1 + word.chars().count();
        if !current.is_empty() && needed > max_len {
            pieces.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Light cleanup for stored answers before they are spoken: line breaks
/// become sentence breaks and doubled periods collapse.
pub fn clean_for_speech(text: &str) -> String {
    let mut joined = String::with_capacity(text.len());
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !joined.is_empty() {
            let ends_sentence = joined.ends_with(['.', '!', '?', ':', ';']);
            joined.push_str(if ends_sentence { " " } else { ". " });
        }
        joined.push_str(line);
    }
    let mut text = collapse_whitespace(&joined);
    while text.contains("..") || text.contains(". .") {
        text = text.replace("..", ".").replace(". .", ".");
    }
    text
}

// ─────────────────────────────────────────────────────────────────────────────
// TextProcessor
// ─────────────────────────────────────────────────────────────────────────────

/// Statistics about an input text, computed on both raw and cleaned forms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextStats {
    pub original_length: usize,
    pub cleaned_length: usize,
    pub word_count: usize,
    pub sentence_count: usize,
    pub avg_words_per_sentence: f32,
    pub has_numbers: bool,
    pub has_special_chars: bool,
}

/// Cleans, segments and chunks text for the synthesis model.
#[derive(Debug, Clone)]
pub struct TextProcessor {
    pub max_chunk_chars: usize,
}

impl Default for TextProcessor {
    fn default() -> Self {
        Self { max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS }
    }
}

impl TextProcessor {
    pub fn new(max_chunk_chars: usize) -> Self {
        Self { max_chunk_chars: max_chunk_chars.max(1) }
    }

    /// Lowercase, expand abbreviations, small numbers and symbols, then strip
    /// anything the model has no use for.
    pub fn clean(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        let mut text = collapse_whitespace(&text.to_lowercase());

        for (re, expansion) in RE_ABBREVIATIONS.iter() {
            text = re.replace_all(&text, *expansion).into_owned();
        }

        text = text
            .split(' ')
            .map(|word| expand_number_token(word).unwrap_or_else(|| word.to_string()))
            .collect::<Vec<_>>()
            .join(" ");

        text = expand_symbols(&text);
        text = RE_DISALLOWED.replace_all(&text, " ").into_owned();

        collapse_whitespace(&text)
    }

    /// Split after runs of `.`, `!` or `?` followed by whitespace. Terminal
    /// punctuation stays with its sentence.
    pub fn segment_sentences(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut start = 0;
        for caps in RE_SENTENCE_END.captures_iter(text) {
            let (Some(whole), Some(punct)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let sentence = text[start..punct.end()].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            start = whole.end();
        }
        let tail = text[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }
        sentences
    }

    /// Greedily pack sentences into chunks of at most `max_len` characters.
    pub fn chunk(&self, text: &str, max_len: usize) -> Vec<String> {
        let max_len = max_len.max(1);
        let mut chunks = Vec::new();
        let mut current = String::new();

        for sentence in self.segment_sentences(text) {
            for piece in wrap_words(&sentence, max_len) {
                let joined_len = if current.is_empty() {
                    piece.chars().count()
                } else {
                    current.chars().count() + 1 + piece.chars().count()
                };
                if joined_len <= max_len {
                    if !current.is_empty() {
                        current.push(' ');
                    }
                    current.push_str(&piece);
                } else {
                    if !current.is_empty() {
                        chunks.push(std::mem::take(&mut current));
                    }
                    current = piece;
                }
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    /// Full pipeline: clean → segment → chunk.
    pub fn preprocess_for_tts(&self, text: &str, max_len: usize) -> Vec<String> {
        let cleaned = self.clean(text);
        self.chunk(&cleaned, max_len)
    }

    /// Same as [`preprocess_for_tts`](Self::preprocess_for_tts) with the
    /// processor's own limit.
    pub fn preprocess(&self, text: &str) -> Vec<String> {
        self.preprocess_for_tts(text, self.max_chunk_chars)
    }

    pub fn validate(&self, text: &str) -> Result<()> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Error::EmptyText);
        }
        if trimmed.chars().count() < MIN_TEXT_CHARS {
            return Err(Error::InvalidText(format!(
                "shorter than {MIN_TEXT_CHARS} characters"
            )));
        }
        if text.chars().count() > LONG_TEXT_WARN_CHARS {
            warn!(chars = text.chars().count(), "Text is very long, consider breaking it into smaller pieces");
        }
        Ok(())
    }

    pub fn stats(&self, text: &str) -> TextStats {
        let cleaned = self.clean(text);
        let sentence_count = self.segment_sentences(&cleaned).len();
        let word_count = cleaned.split_whitespace().count();
        TextStats {
            original_length: text.chars().count(),
            cleaned_length: cleaned.chars().count(),
            word_count,
            sentence_count,
            avg_words_per_sentence: if sentence_count == 0 {
                0.0
            } else {
                word_count as f32 / sentence_count as f32
            },
            has_numbers: RE_DIGIT.is_match(text),
            has_special_chars: RE_SPECIAL.is_match(text),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn tp() -> TextProcessor {
        TextProcessor::default()
    }

    #[test]
    fn test_number_table() {
        assert_eq!(number_to_words(0), Some("zero"));
        assert_eq!(number_to_words(20), Some("twenty"));
        assert_eq!(number_to_words(21), None);
    }

    #[test]
    fn test_clean_abbreviations_numbers_symbols() {
        let out = tp().clean("Dr. Smith lives on 123 Main St. He has 5 cats & 2 dogs.");
        assert_eq!(out, "doctor smith lives on 123 main street he has five cats and two dogs.");
    }

    #[test]
    fn test_abbreviation_needs_word_start() {
        // "first." must not turn into "firstreet"
        let out = tp().clean("He came first.");
        assert_eq!(out, "he came first.");
    }

    #[test]
    fn test_number_keeps_punctuation() {
        assert_eq!(tp().clean("Pick (7), please!"), "pick seven , please!");
        assert_eq!(tp().clean("I have 05 apples"), "i have 05 apples");
    }

    #[test]
    fn test_clean_strips_disallowed() {
        let out = tp().clean("Visit us @ home: it's *great*");
        assert_eq!(out, "visit us at home it's great");
    }

    #[test]
    fn test_clean_empty() {
        assert_eq!(tp().clean(""), "");
        assert_eq!(tp().clean("   \n\t"), "");
    }

    #[test]
    fn test_segment_sentences() {
        let s = tp().segment_sentences("Hello! How are you today? I hope you're well.");
        assert_eq!(s, vec!["Hello!", "How are you today?", "I hope you're well."]);
    }

    #[test]
    fn test_segment_without_terminal_punctuation() {
        let s = tp().segment_sentences("one. two");
        assert_eq!(s, vec!["one.", "two"]);
    }

    #[test]
    fn test_chunk_groups_sentences() {
        let chunks = tp().chunk("aaa bbb. ccc ddd. eee fff.", 18);
        assert_eq!(chunks, vec!["aaa bbb. ccc ddd.", "eee fff."]);
    }

    #[test]
    fn test_chunk_wraps_long_sentence() {
        let long = "word ".repeat(200);
        let chunks = tp().chunk(long.trim(), 50);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50, "chunk too long: {}", chunk.len());
        }
    }

    #[test]
    fn test_chunk_keeps_oversized_word() {
        let chunks = tp().chunk("supercalifragilistic", 5);
        assert_eq!(chunks, vec!["supercalifragilistic"]);
    }

    #[test]
    fn test_preprocess_for_tts() {
        let chunks = tp().preprocess_for_tts("Hello there. I have 3 dogs!", 500);
        assert_eq!(chunks, vec!["hello there. i have three dogs!"]);
        assert!(tp().preprocess_for_tts("", 500).is_empty());
    }

    #[test]
    fn test_validate() {
        assert!(matches!(tp().validate("   "), Err(Error::EmptyText)));
        assert!(matches!(tp().validate("hi"), Err(Error::InvalidText(_))));
        assert!(tp().validate("hello").is_ok());
    }

    #[test]
    fn test_stats() {
        let stats = tp().stats("Hello world. I have 2 cats!");
        assert_eq!(stats.word_count, 6);
        assert_eq!(stats.sentence_count, 2);
        assert!((stats.avg_words_per_sentence - 3.0).abs() < 1e-6);
        assert!(stats.has_numbers);
        assert!(stats.has_special_chars);
    }

    #[test]
    fn test_clean_for_speech() {
        let out = clean_for_speech("First line\nSecond line.\n\nThird..  line");
        assert_eq!(out, "First line. Second line. Third. line");
    }
}
