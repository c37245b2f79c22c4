//! Vocabulary collaborators: label lookup, word storage, translation.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Shown when no translation is known.
pub const MISSING_TRANSLATION: &str = "—";
/// Shown when no phonetic spelling is known.
pub const MISSING_PHONETIC: &str = "/ — /";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexiconEntry {
    pub translation: String,
    pub phonetic: String,
}

/// Label to translation and phonetic lookup.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    entries: HashMap<String, LexiconEntry>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Common everyday labels.
    pub fn builtin() -> Self {
        let mut lexicon = Self::new();
        for (label, translation, phonetic) in [
            ("apple", "苹果", "/ˈæpəl/"),
            ("banana", "香蕉", "/bəˈnænə/"),
            ("book", "书", "/bʊk/"),
            ("bottle", "瓶子", "/ˈbɒtəl/"),
            ("car", "汽车", "/kɑːr/"),
            ("cat", "猫", "/kæt/"),
            ("chair", "椅子", "/tʃeər/"),
            ("cup", "杯子", "/kʌp/"),
            ("dog", "狗", "/dɒɡ/"),
            ("flower", "花", "/ˈflaʊər/"),
            ("phone", "手机", "/foʊn/"),
            ("shoe", "鞋", "/ʃuː/"),
            ("table", "桌子", "/ˈteɪbəl/"),
            ("tree", "树", "/triː/"),
        ] {
            lexicon.insert(label, translation, phonetic);
        }
        lexicon
    }

    pub fn insert(&mut self, label: &str, translation: &str, phonetic: &str) {
        self.entries.insert(
            label.trim().to_lowercase(),
            LexiconEntry {
                translation: translation.to_string(),
                phonetic: phonetic.to_string(),
            },
        );
    }

    /// Add entries from a tab-separated file: `label<TAB>translation[<TAB>phonetic]`.
    /// Blank lines and lines starting with `#` are skipped.
    pub fn extend_from_tsv<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read lexicon from {}", path.display()))?;
        Ok(self.extend_from_str(&text))
    }

    fn extend_from_str(&mut self, text: &str) -> usize {
        let mut added = 0;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split('\t');
            let (Some(label), Some(translation)) = (fields.next(), fields.next()) else {
                tracing::warn!("Skipping malformed lexicon line: {}", line);
                continue;
            };
            let phonetic = fields.next().unwrap_or(MISSING_PHONETIC);
            self.insert(label, translation.trim(), phonetic.trim());
            added += 1;
        }
        added
    }

    /// Translation and phonetic for `label`, with placeholders when unknown.
    pub fn lookup(&self, label: &str) -> LexiconEntry {
        self.entries
            .get(&label.trim().to_lowercase())
            .cloned()
            .unwrap_or_else(|| LexiconEntry {
                translation: MISSING_TRANSLATION.to_string(),
                phonetic: MISSING_PHONETIC.to_string(),
            })
    }
}

pub type WordId = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub id: WordId,
    pub english: String,
    pub chinese: String,
}

/// Destination for accepted vocabulary entries.
///
/// Calls are fire-and-forget from the capture session's point of view.
pub trait WordStore: Send + Sync {
    /// Add an entry. Returns `None` if it was not stored.
    fn add(&self, english: &str, chinese: &str) -> Option<WordId>;

    /// Replace the translation of an existing entry.
    fn update(&self, id: WordId, chinese: &str);
}

/// Translation lookup used when the lexicon has no entry.
pub trait Translator: Send + Sync {
    /// Returns `None` when no translation could be found.
    fn translate(&self, english: &str) -> Option<String>;
}

/// In-memory word list, newest first.
#[derive(Debug, Default)]
pub struct MemoryWordStore {
    words: Mutex<Vec<Word>>,
}

impl MemoryWordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn words(&self) -> Vec<Word> {
        match self.words.lock() {
            Ok(words) => words.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl WordStore for MemoryWordStore {
    fn add(&self, english: &str, chinese: &str) -> Option<WordId> {
        let mut words = self.words.lock().ok()?;
        let key = english.to_lowercase();
        if words.iter().any(|w| w.english.to_lowercase() == key) {
            tracing::debug!("'{}' already in word list", english);
            return None;
        }
        let id = words.iter().map(|w| w.id).max().unwrap_or(0) + 1;
        words.insert(
            0,
            Word {
                id,
                english: english.to_string(),
                chinese: chinese.to_string(),
            },
        );
        Some(id)
    }

    fn update(&self, id: WordId, chinese: &str) {
        let Ok(mut words) = self.words.lock() else {
            return;
        };
        if let Some(word) = words.iter_mut().find(|w| w.id == id) {
            word.chinese = chinese.to_string();
        }
    }
}
