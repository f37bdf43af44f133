//! Text normalization - tokenization, stopwords, POS tagging, lemmatization
//!
//! Query-side normalization (stopword filtering, per-POS lemmatization) and
//! plain document-side tokenization are deliberately separate: term
//! statistics count every word of a document, stopwords included.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashSet;

static WORD_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-zA-Z0-9]+").unwrap());

/// Lowercased word tokens in document order, no filtering.
///
/// Used for term frequency and document length; duplicates and order are
/// significant.
pub fn word_tokens(text: &str) -> Vec<String> {
    WORD_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Coarse part-of-speech classes accepted by the lemmatizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosTag {
    Noun,
    Verb,
    Adjective,
    Adverb,
}

/// Part-of-speech tagging capability.
pub trait PosTagger: Send + Sync {
    fn tag(&self, word: &str) -> PosTag;
}

/// Suffix-heuristic tagger. Nouns are the fallback class, matching the
/// tag-dictionary default of the reference tagger.
pub struct SuffixTagger;

impl PosTagger for SuffixTagger {
    fn tag(&self, word: &str) -> PosTag {
        if word.ends_with("ly") {
            PosTag::Adverb
        } else if word.ends_with("ing") || word.ends_with("ed") || word.ends_with("ize") {
            PosTag::Verb
        } else if word.ends_with("ous")
            || word.ends_with("ful")
            || word.ends_with("ive")
            || word.ends_with("able")
            || word.ends_with("al")
        {
            PosTag::Adjective
        } else {
            PosTag::Noun
        }
    }
}

/// Lemmatization capability: reduce an inflected word to its base form.
pub trait Lemmatizer: Send + Sync {
    fn lemmatize(&self, word: &str, tag: PosTag) -> String;
}

/// Rule-based English lemmatizer. Identity when no rule applies.
pub struct EnglishLemmatizer;

impl Lemmatizer for EnglishLemmatizer {
    fn lemmatize(&self, word: &str, tag: PosTag) -> String {
        match tag {
            PosTag::Noun => lemmatize_noun(word),
            PosTag::Verb => lemmatize_verb(word),
            PosTag::Adjective => lemmatize_adjective(word),
            PosTag::Adverb => word.to_string(),
        }
    }
}

fn lemmatize_noun(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        if stem.len() >= 2 {
            return format!("{stem}y");
        }
    }
    if let Some(stem) = word.strip_suffix("sses") {
        return format!("{stem}ss");
    }
    if let Some(stem) = word.strip_suffix("es") {
        if stem.ends_with("sh") || stem.ends_with("ch") || stem.ends_with('x') {
            return stem.to_string();
        }
    }
    if word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") && word.len() > 3 {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

fn lemmatize_verb(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ing") {
        if stem.len() >= 3 {
            return undouble(stem);
        }
    }
    if let Some(stem) = word.strip_suffix("ed") {
        if stem.len() >= 3 {
            return undouble(stem);
        }
    }
    word.to_string()
}

fn lemmatize_adjective(word: &str) -> String {
    for suffix in ["est", "er"] {
        if let Some(stem) = word.strip_suffix(suffix) {
            if stem.len() >= 3 {
                return stem.to_string();
            }
        }
    }
    word.to_string()
}

/// Collapse a doubled final consonant left behind by suffix stripping
/// ("runn" -> "run").
fn undouble(stem: &str) -> String {
    let bytes = stem.as_bytes();
    let n = bytes.len();
    if n >= 2 && bytes[n - 1] == bytes[n - 2] && !b"aeiou".contains(&bytes[n - 1]) {
        stem[..n - 1].to_string()
    } else {
        stem.to_string()
    }
}

/// Language-scoped stopword set.
pub struct Stopwords {
    words: FxHashSet<String>,
}

impl Stopwords {
    /// Built-in English list.
    pub fn english() -> Self {
        let words = ENGLISH_STOPWORDS
            .iter()
            .map(|w| w.to_string())
            .collect::<FxHashSet<_>>();
        Self { words }
    }

    /// Load a newline-delimited stopword file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let words = content
            .lines()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect::<FxHashSet<_>>();
        Ok(Self { words })
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }
}

const ENGLISH_STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "but", "by", "for", "from", "had", "has",
    "have", "he", "her", "his", "i", "if", "in", "into", "is", "it", "its", "no", "not", "of",
    "on", "or", "our", "she", "so", "such", "that", "the", "their", "them", "then", "there",
    "these", "they", "this", "to", "was", "we", "were", "which", "while", "will", "with", "you",
];

/// Bundled query-side normalization pipeline.
pub struct Normalizer {
    stopwords: Stopwords,
    tagger: Box<dyn PosTagger>,
    lemmatizer: Option<Box<dyn Lemmatizer>>,
}

impl Normalizer {
    pub fn new(
        stopwords: Stopwords,
        tagger: Box<dyn PosTagger>,
        lemmatizer: Option<Box<dyn Lemmatizer>>,
    ) -> Self {
        Self {
            stopwords,
            tagger,
            lemmatizer,
        }
    }

    /// Default English pipeline with lemmatization enabled.
    pub fn english() -> Self {
        Self::new(
            Stopwords::english(),
            Box::new(SuffixTagger),
            Some(Box::new(EnglishLemmatizer)),
        )
    }

    /// Tokenize a query: lowercase, strip punctuation, drop stopwords,
    /// lemmatize per POS when a lemmatizer is configured.
    ///
    /// Order and duplicates are preserved.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        word_tokens(text)
            .into_iter()
            .filter(|w| !self.stopwords.contains(w))
            .map(|w| self.lemmatize(&w))
            .collect()
    }

    /// Lemmatize one word using the configured tagger, identity when
    /// lemmatization is disabled.
    pub fn lemmatize(&self, word: &str) -> String {
        match &self.lemmatizer {
            Some(lemmatizer) => lemmatizer.lemmatize(word, self.tagger.tag(word)),
            None => word.to_string(),
        }
    }
}
