//! Word-embedding vocabulary - lookup, cosine similarity, nearest neighbors
//!
//! Backs query expansion. Vectors are loaded once from the word2vec text
//! format and scanned brute-force; vocabulary order is file order, which
//! keeps neighbor scans deterministic.

use std::io::{BufRead, BufReader};
use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::info;

use crate::error::RankError;

/// In-memory word-vector model.
pub struct WordVectors {
    words: Vec<String>,
    vectors: Vec<Vec<f32>>,
    index: FxHashMap<String, usize>,
    dimensions: usize,
}

impl WordVectors {
    /// Load a model in word2vec text format: one `word f1 f2 ... fD` line per
    /// word, with an optional `count dims` header line.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| anyhow::anyhow!("cannot open word vectors {}: {e}", path.display()))?;
        let reader = BufReader::new(file);

        let mut words = Vec::new();
        let mut vectors: Vec<Vec<f32>> = Vec::new();
        let mut index = FxHashMap::default();
        let mut dimensions = 0usize;

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else { continue };
            let values: Vec<f32> = parts
                .map(|p| p.parse::<f32>())
                .collect::<Result<_, _>>()
                .map_err(|e| anyhow::anyhow!("bad vector on line {}: {e}", lineno + 1))?;

            // Header line of the word2vec format: two integers, no word.
            if lineno == 0 && values.len() == 1 && word.parse::<usize>().is_ok() {
                continue;
            }
            if values.is_empty() {
                anyhow::bail!("no vector components on line {}", lineno + 1);
            }
            if dimensions == 0 {
                dimensions = values.len();
            } else if values.len() != dimensions {
                anyhow::bail!(
                    "dimension mismatch on line {}: expected {}, got {}",
                    lineno + 1,
                    dimensions,
                    values.len()
                );
            }

            index.insert(word.to_lowercase(), words.len());
            words.push(word.to_lowercase());
            vectors.push(values);
        }

        if words.is_empty() {
            anyhow::bail!("empty word vector file: {}", path.display());
        }

        info!(
            "Loaded {} word vectors ({} dims) from {}",
            words.len(),
            dimensions,
            path.display()
        );

        Ok(Self {
            words,
            vectors,
            index,
            dimensions,
        })
    }

    /// Build a model from in-memory (word, vector) pairs.
    pub fn from_pairs(pairs: Vec<(&str, Vec<f32>)>) -> Self {
        let mut words = Vec::with_capacity(pairs.len());
        let mut vectors = Vec::with_capacity(pairs.len());
        let mut index = FxHashMap::default();
        let mut dimensions = 0;
        for (word, vector) in pairs {
            dimensions = vector.len();
            index.insert(word.to_string(), words.len());
            words.push(word.to_string());
            vectors.push(vector);
        }
        Self {
            words,
            vectors,
            index,
            dimensions,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    pub fn get(&self, word: &str) -> Option<&[f32]> {
        self.index.get(word).map(|&i| self.vectors[i].as_slice())
    }

    /// Cosine similarity between two in-vocabulary words.
    pub fn similarity(&self, a: &str, b: &str) -> Result<f32, RankError> {
        let va = self.get(a).ok_or(RankError::VocabularyMiss)?;
        let vb = self.get(b).ok_or(RankError::VocabularyMiss)?;
        cosine(va, vb)
    }

    /// Average cosine similarity of `word` against the in-vocabulary subset
    /// of `base`. Fails with VocabularyMiss when no base word is in
    /// vocabulary; the average must never fall back to dividing by zero.
    pub fn mean_similarity(&self, word: &str, base: &[String]) -> Result<f32, RankError> {
        let mut total = 0.0f32;
        let mut count = 0usize;
        for token in base {
            if self.contains(token) {
                total += self.similarity(token, word)?;
                count += 1;
            }
        }
        if count == 0 {
            return Err(RankError::VocabularyMiss);
        }
        Ok(total / count as f32)
    }

    /// The `k` vocabulary words closest to `target` by cosine similarity,
    /// descending. Words listed in `exclude` and zero-norm entries are
    /// skipped.
    pub fn nearest(&self, target: &[f32], k: usize, exclude: &[&str]) -> Vec<(String, f32)> {
        if k == 0 {
            return Vec::new();
        }
        let excluded: FxHashSet<&str> = exclude.iter().copied().collect();
        let mut scored: Vec<(usize, f32)> = Vec::new();
        for (i, vector) in self.vectors.iter().enumerate() {
            if excluded.contains(self.words[i].as_str()) {
                continue;
            }
            if let Ok(sim) = cosine(target, vector) {
                scored.push((i, sim));
            }
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
            .into_iter()
            .map(|(i, sim)| (self.words[i].clone(), sim))
            .collect()
    }

    /// The `k` nearest neighbors of one in-vocabulary word, the word itself
    /// excluded. `None` when the word is out of vocabulary.
    pub fn nearest_to_word(&self, word: &str, k: usize) -> Option<Vec<(String, f32)>> {
        let vector = self.get(word)?;
        Some(self.nearest(vector, k, &[word]))
    }
}

/// Cosine similarity between two dense vectors; DegenerateVector when either
/// norm is zero.
pub fn cosine(a: &[f32], b: &[f32]) -> Result<f32, RankError> {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(RankError::DegenerateVector);
    }
    Ok(dot / (norm_a * norm_b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> WordVectors {
        WordVectors::from_pairs(vec![
            ("cat", vec![1.0, 0.0]),
            ("feline", vec![0.9, 0.1]),
            ("dog", vec![0.0, 1.0]),
            ("canine", vec![0.1, 0.9]),
        ])
    }

    #[test]
    fn similarity_is_cosine() {
        let wv = model();
        let sim = wv.similarity("cat", "cat").unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
        let sim = wv.similarity("cat", "dog").unwrap();
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn similarity_requires_vocabulary() {
        let wv = model();
        assert!(matches!(
            wv.similarity("cat", "zebra"),
            Err(RankError::VocabularyMiss)
        ));
    }

    #[test]
    fn nearest_excludes_requested_words() {
        let wv = model();
        let neighbors = wv.nearest_to_word("cat", 2).unwrap();
        assert_eq!(neighbors[0].0, "feline");
        assert!(neighbors.iter().all(|(w, _)| w != "cat"));
    }

    #[test]
    fn nearest_skips_zero_norm_entries() {
        let wv = WordVectors::from_pairs(vec![
            ("cat", vec![1.0, 0.0]),
            ("null", vec![0.0, 0.0]),
            ("feline", vec![0.9, 0.1]),
        ]);
        let neighbors = wv.nearest(&[1.0, 0.0], 3, &[]);
        assert!(neighbors.iter().all(|(w, _)| w != "null"));
    }

    #[test]
    fn mean_similarity_averages_in_vocabulary_base() {
        let wv = model();
        let base = vec!["cat".to_string(), "zebra".to_string()];
        let sim = wv.mean_similarity("feline", &base).unwrap();
        let direct = wv.similarity("cat", "feline").unwrap();
        assert!((sim - direct).abs() < 1e-6);
    }

    #[test]
    fn mean_similarity_fails_on_fully_oov_base() {
        let wv = model();
        let base = vec!["zebra".to_string()];
        assert!(matches!(
            wv.mean_similarity("feline", &base),
            Err(RankError::VocabularyMiss)
        ));
    }

    #[test]
    fn load_word2vec_text_format() {
        let path = std::env::temp_dir().join("docrank-vectors-test.txt");
        std::fs::write(&path, "2 3\ncat 1.0 0.0 0.0\ndog 0.0 1.0 0.0\n").unwrap();
        let wv = WordVectors::load(&path).unwrap();
        assert_eq!(wv.len(), 2);
        assert_eq!(wv.dimensions(), 3);
        assert!(wv.contains("cat"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_rejects_dimension_mismatch() {
        let path = std::env::temp_dir().join("docrank-vectors-bad-test.txt");
        std::fs::write(&path, "cat 1.0 0.0\ndog 0.0\n").unwrap();
        assert!(WordVectors::load(&path).is_err());
        std::fs::remove_file(&path).ok();
    }
}
