//! Configuration file support
//!
//! Config file location: ~/.config/docrank/config.toml
//!
//! Example config:
//! ```toml
//! language = "en"
//!
//! [vectors]
//! path = "/data/word2vec-en.txt"
//! # stopwords_path = "/data/stopwords-en.txt"
//!
//! [expansion]
//! k = 10
//! n = 5
//! bridging = false
//!
//! [scoring]
//! policy = "tfidf-sum"  # multiply, sum, sum-weighted, tfidf-sum, tfidf-sum-weighted
//! alpha = 0.7
//! default_m = 5
//!
//! [embedding]
//! url = "http://localhost:4001/api/v1/embeddings/create"
//!
//! [corpus]
//! path = "/data/corpus.json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Language the linguistic resources cover
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub vectors: VectorsConfig,

    #[serde(default)]
    pub expansion: ExpansionConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub corpus: CorpusConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: default_language(),
            vectors: VectorsConfig::default(),
            expansion: ExpansionConfig::default(),
            scoring: ScoringConfig::default(),
            embedding: EmbeddingConfig::default(),
            corpus: CorpusConfig::default(),
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

/// Word-vector model configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorsConfig {
    /// Path to a word2vec text-format model
    pub path: Option<PathBuf>,

    /// Newline-delimited stopword file; built-in English list when unset
    pub stopwords_path: Option<PathBuf>,
}

/// Query expansion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpansionConfig {
    /// Neighbors fetched per token
    #[serde(default = "default_k")]
    pub k: usize,

    /// Expansion terms kept after ranking
    #[serde(default = "default_n")]
    pub n: usize,

    /// Bridge adjacent token pairs before gathering candidates
    #[serde(default)]
    pub bridging: bool,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            n: default_n(),
            bridging: false,
        }
    }
}

fn default_k() -> usize {
    10
}

fn default_n() -> usize {
    5
}

/// Scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Policy name: multiply, sum, sum-weighted, tfidf-sum, tfidf-sum-weighted
    #[serde(default = "default_policy")]
    pub policy: String,

    /// Weight of original tokens under the weighted policies
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Results returned when the caller does not say; 0 means unbounded
    #[serde(default = "default_m")]
    pub default_m: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            alpha: default_alpha(),
            default_m: default_m(),
        }
    }
}

fn default_policy() -> String {
    "tfidf-sum".to_string()
}

fn default_alpha() -> f64 {
    0.7
}

fn default_m() -> usize {
    5
}

/// Embedding service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// URL of the text-embedding service
    #[serde(default = "default_embedding_url")]
    pub url: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
        }
    }
}

fn default_embedding_url() -> String {
    "http://localhost:4001/api/v1/embeddings/create".to_string()
}

/// Corpus store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Path of the JSON corpus store
    #[serde(default = "default_corpus_path")]
    pub path: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: default_corpus_path(),
        }
    }
}

fn default_corpus_path() -> PathBuf {
    PathBuf::from("corpus.json")
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("DOCRANK_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docrank")
            .join("config.toml")
    }

    /// Load config from file, returning defaults if not found
    pub fn load() -> Self {
        let path = Self::config_path();
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config {}: {}", path.display(), e);
                }
            }
        }
        Self::default()
    }
}
