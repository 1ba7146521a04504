//! Character-level tokeniser for VITS / MMS-TTS models.
//!
//! MMS checkpoints ship a `vocab.json` mapping each character to an integer
//! ID. Encoding lowercases the text, drops characters missing from the
//! vocabulary, and (when the model was trained with `add_blank`) interleaves
//! the blank ID 0 between tokens:
//!
//! ```text
//! "hi" → [h, i] → [0, h, 0, i, 0]
//! ```

use std::{collections::HashMap, path::Path};

use anyhow::Context;

use crate::Result;

/// ID interleaved between tokens when `add_blank` is set.
const BLANK_ID: i64 = 0;

#[derive(Debug, Clone)]
pub struct VitsTokenizer {
    vocab: HashMap<char, i64>,
    add_blank: bool,
    lowercase: bool,
}

impl VitsTokenizer {
    /// Build from an in-memory vocabulary. Multi-character keys (special
    /// tokens such as `<pad>`) are ignored.
    pub fn from_vocab(vocab: HashMap<String, i64>, add_blank: bool, lowercase: bool) -> Self {
        let vocab = vocab
            .into_iter()
            .filter_map(|(k, v)| {
                let mut chars = k.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some((c, v)),
                    _ => None,
                }
            })
            .collect();
        Self { vocab, add_blank, lowercase }
    }

    /// Load `vocab.json` from a downloaded model repository.
    pub fn from_vocab_file(path: &Path, add_blank: bool, lowercase: bool) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Cannot read vocab: {}", path.display()))?;
        let vocab: HashMap<String, i64> = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse vocab: {}", path.display()))?;
        Ok(Self::from_vocab(vocab, add_blank, lowercase))
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    /// Map a character to its vocabulary index, `None` for unknowns.
    pub fn char_to_id(&self, c: char) -> Option<i64> {
        self.vocab.get(&c).copied()
    }

    /// Encode text into model input IDs. Returns an empty vector when no
    /// character survives the vocabulary filter.
    pub fn encode(&self, text: &str) -> Vec<i64> {
        let text = if self.lowercase { text.to_lowercase() } else { text.to_string() };
        let tokens: Vec<i64> = text.chars().filter_map(|c| self.char_to_id(c)).collect();

        if !self.add_blank || tokens.is_empty() {
            return tokens;
        }

        let mut ids = Vec::with_capacity(tokens.len() * 2 + 1);
        ids.push(BLANK_ID);
        for t in tokens {
            ids.push(t);
            ids.push(BLANK_ID);
        }
        ids
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
