//! Question/answer knowledge base with spoken answers.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::{convert::TextToAudioConverter, text::clean_for_speech, Result};

/// Shared words shorter than this do not count towards a match.
const MIN_SCORED_WORD: usize = 4;

/// Stored-question words at least this long earn a bonus when they appear
/// anywhere in the query.
const MIN_BONUS_WORD: usize = 6;
const BONUS: usize = 2;

const DEFAULT_ENTRIES: &[(&str, &str)] = &[
    (
        "what is artificial intelligence",
        "Artificial Intelligence, or AI, is the simulation of human intelligence in machines. It includes machine learning, natural language processing, and computer vision to enable computers to perform tasks that typically require human intelligence.",
    ),
    (
        "how does text to speech work",
        "Text-to-speech works by converting written text into spoken words. It uses neural networks to analyze text, understand pronunciation, and generate natural-sounding speech audio using advanced deep learning models.",
    ),
    (
        "what is machine learning",
        "Machine learning is a subset of artificial intelligence that enables computers to learn and make decisions from data without being explicitly programmed. It uses algorithms to identify patterns and make predictions.",
    ),
    (
        "what is python programming",
        "Python is a high-level, interpreted programming language known for its simple syntax and versatility. It's widely used in web development, data science, artificial intelligence, and automation.",
    ),
    (
        "how do neural networks work",
        "Neural networks are computing systems inspired by biological neural networks. They consist of interconnected nodes that process information, learn patterns from data, and make predictions through weighted connections and activation functions.",
    ),
    (
        "what are the benefits of ai",
        "AI benefits include automation of repetitive tasks, improved decision-making through data analysis, enhanced productivity, better healthcare diagnostics, personalized user experiences, and solutions to complex problems.",
    ),
    (
        "what is deep learning",
        "Deep learning is a subset of machine learning that uses artificial neural networks with multiple layers to model and understand complex patterns in data. It's particularly effective for tasks like image recognition and natural language processing.",
    ),
    (
        "how does speech recognition work",
        "Speech recognition converts spoken language into text using acoustic models, language models, and signal processing. It analyzes audio waves, identifies phonemes, and matches them to words using machine learning algorithms.",
    ),
];

// ─────────────────────────────────────────────────────────────────────────────
// KnowledgeBase
// ─────────────────────────────────────────────────────────────────────────────

/// Normalized question → answer, in insertion order.
///
/// Order matters: containment and score ties go to the earliest entry, and
/// the JSON file is written back in the order it was read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeBase {
    entries: IndexMap<String, String>,
}

/// Lowercase, trim, and drop trailing `?`, `.` and `!`.
pub fn normalize_question(question: &str) -> String {
    question
        .trim()
        .to_lowercase()
        .trim_end_matches(['?', '.', '!'])
        .trim_end()
        .to_string()
}

impl KnowledgeBase {
    pub fn with_defaults() -> Self {
        let entries = DEFAULT_ENTRIES
            .iter()
            .map(|(q, a)| (q.to_string(), a.to_string()))
            .collect();
        Self { entries }
    }

    /// Read a JSON object of question → answer. A missing file yields the
    /// defaults; so does an unparseable one, with a warning.
    pub fn load_or_default(path: &Path) -> Self {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(_) => return Self::with_defaults(),
        };
        match serde_json::from_slice::<IndexMap<String, String>>(&bytes) {
            Ok(entries) => {
                info!(path = %path.display(), entries = entries.len(), "Loaded Q&A database");
                Self { entries }
            }
            Err(e) => {
                warn!(path = %path.display(), "Ignoring unreadable Q&A database: {e}");
                Self::with_defaults()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Q&A database saved");
        Ok(())
    }

    /// Best stored answer for `question`.
    ///
    /// Tried in order: exact match after normalization, containment either
    /// way, then a word-overlap score where the highest positive score wins.
    pub fn find_answer(&self, question: &str) -> Option<&str> {
        let query = normalize_question(question);
        if query.is_empty() {
            return None;
        }

        if let Some(answer) = self.entries.get(&query) {
            return Some(answer.as_str());
        }

        if let Some(answer) = self
            .entries
            .iter()
            .find(|(q, _)| q.contains(query.as_str()) || query.contains(q.as_str()))
            .map(|(_, a)| a.as_str())
        {
            return Some(answer);
        }

        let query_words: HashSet<&str> = query.split_whitespace().collect();
        let mut best: Option<(&str, usize)> = None;
        for (stored, answer) in &self.entries {
            let stored_words: HashSet<&str> = stored.split_whitespace().collect();
            let mut score = query_words
                .intersection(&stored_words)
                .filter(|w| w.len() >= MIN_SCORED_WORD)
                .count();
            if stored_words
                .iter()
                .any(|w| w.len() >= MIN_BONUS_WORD && query.contains(w))
            {
                score += BONUS;
            }
            if score > 0 && best.map_or(true, |(_, s)| score > s) {
                best = Some((answer.as_str(), score));
            }
        }
        best.map(|(answer, _)| answer)
    }

    /// Insert or replace an entry under the normalized question. A replaced
    /// entry keeps its position.
    pub fn add(&mut self, question: &str, answer: &str) {
        self.entries.insert(normalize_question(question), answer.trim().to_string());
    }

    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(q, a)| (q.as_str(), a.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ─────────────────────────────────────────────────────────────────────────────
// QaSession
// ─────────────────────────────────────────────────────────────────────────────

/// A knowledge base persisted at `db_path` and spoken through a converter.
pub struct QaSession {
    kb: KnowledgeBase,
    converter: TextToAudioConverter,
    db_path: PathBuf,
}

impl QaSession {
    /// Open the database at `db_path`, falling back to the defaults.
    pub fn open(converter: TextToAudioConverter, db_path: impl Into<PathBuf>) -> Self {
        let db_path = db_path.into();
        let kb = KnowledgeBase::load_or_default(&db_path);
        Self { kb, converter, db_path }
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn converter(&self) -> &TextToAudioConverter {
        &self.converter
    }

    /// Speak the answer to `question`. `Ok(None)` when nothing matches.
    pub fn ask(&self, question: &str) -> Result<Option<(PathBuf, String)>> {
        info!(question, "Question received");
        let Some(answer) = self.kb.find_answer(question) else {
            info!("No answer found");
            return Ok(None);
        };

        let spoken = clean_for_speech(answer);
        let filename = format!("qa_answer_{}", chrono::Utc::now().timestamp());
        let path = self.converter.convert_text(&spoken, Some(&filename))?;
        Ok(Some((path, answer.to_string())))
    }

    /// Add a pair and write the database back to disk.
    pub fn add_pair(&mut self, question: &str, answer: &str) -> Result<()> {
        self.kb.add(question, answer);
        self.kb.save(&self.db_path)
    }

    /// Speak every entry as `Question: ...? Answer: ...` into
    /// `qa_batch_{NNN}` files. Failures are logged and skipped.
    pub fn convert_all(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for (i, (question, answer)) in self.kb.iter().enumerate() {
            let n = i + 1;
            info!("Converting Q&A pair {n}/{}", self.kb.len());
            let text = format!("Question: {}? Answer: {answer}", title_case(question));
            match self.converter.convert_text(&text, Some(&format!("qa_batch_{n:03}"))) {
                Ok(path) => paths.push(path),
                Err(e) => warn!("Q&A pair {n} failed: {e}"),
            }
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_question("  What is AI?! "), "what is ai");
        assert_eq!(normalize_question("Hello."), "hello");
        assert_eq!(normalize_question("???"), "");
    }

    #[test]
    fn test_exact_and_partial_match() {
        let kb = KnowledgeBase::with_defaults();
        assert_eq!(kb.len(), 8);
        assert!(kb.find_answer("What is deep learning?").unwrap().starts_with("Deep learning"));
        // query contained in a stored question
        assert!(kb.find_answer("speech recognition").unwrap().starts_with("Speech recognition"));
        // stored question contained in the query
        assert!(kb
            .find_answer("so, what is machine learning exactly")
            .unwrap()
            .starts_with("Machine learning"));
    }

    #[test]
    fn test_scored_match() {
        let kb = KnowledgeBase::with_defaults();
        let answer = kb.find_answer("explain neural networks to me").unwrap();
        assert!(answer.starts_with("Neural networks"));
        assert_eq!(kb.find_answer("xyz abc"), None);
        assert_eq!(kb.find_answer("?"), None);
    }

    #[test]
    fn test_add_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa.json");

        let mut kb = KnowledgeBase::load_or_default(&path);
        assert_eq!(kb.len(), 8);
        kb.add("What is Rust?", "A systems programming language.");
        kb.save(&path).unwrap();

        let reloaded = KnowledgeBase::load_or_default(&path);
        assert_eq!(reloaded, kb);
        assert_eq!(reloaded.find_answer("what is rust"), Some("A systems programming language."));
    }

    #[test]
    fn test_partial_match_prefers_earliest_entry() {
        let kb = KnowledgeBase::with_defaults();
        // "learning" is in three stored questions, "work" in four
        assert!(kb.find_answer("learning").unwrap().starts_with("Machine learning"));
        assert!(kb.find_answer("work").unwrap().starts_with("Text-to-speech"));
    }

    #[test]
    fn test_order_survives_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa.json");

        let mut kb = KnowledgeBase::with_defaults();
        kb.add("Why is the sky blue?", "Rayleigh scattering.");
        kb.add("what is machine learning", "Replaced answer.");
        kb.save(&path).unwrap();

        let expected: Vec<&str> = DEFAULT_ENTRIES
            .iter()
            .map(|(q, _)| *q)
            .chain(["why is the sky blue"])
            .collect();
        let reloaded = KnowledgeBase::load_or_default(&path);
        assert_eq!(reloaded.questions().collect::<Vec<_>>(), expected);
        assert_eq!(reloaded.find_answer("what is machine learning"), Some("Replaced answer."));
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert_eq!(KnowledgeBase::load_or_default(&path), KnowledgeBase::with_defaults());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("what is ai"), "What Is Ai");
    }
}
