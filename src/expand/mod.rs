//! Query expansion - kNN candidates over the word-embedding space
//!
//! A raw query is tokenized, optionally bridged (nearest neighbor of each
//! adjacent token pair), then widened with the k nearest neighbors of every
//! in-vocabulary token. Candidates are ranked by average similarity to the
//! base tokens and the top n survive.

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::error::RankError;
use crate::text::Normalizer;
use crate::vectors::WordVectors;

/// Result of expanding one query.
#[derive(Debug, Clone)]
pub struct Expansion {
    /// Normalized tokens of the original query, order and duplicates kept.
    pub original: Vec<String>,
    /// Selected expansion tokens, descending by similarity to the original.
    pub expanded: Vec<String>,
}

/// Expands queries against one word-vector model.
pub struct TokenExpander<'a> {
    vectors: &'a WordVectors,
    normalizer: &'a Normalizer,
}

impl<'a> TokenExpander<'a> {
    pub fn new(vectors: &'a WordVectors, normalizer: &'a Normalizer) -> Self {
        Self {
            vectors,
            normalizer,
        }
    }

    /// Normalize a raw query into tokens. Empty output is an input error:
    /// nothing downstream can score an empty token list.
    pub fn tokenize(&self, text: &str) -> Result<Vec<String>, RankError> {
        let tokens = self.normalizer.tokenize(text);
        if tokens.is_empty() {
            return Err(RankError::input("query is empty after tokenization"));
        }
        Ok(tokens)
    }

    /// Bridging tokens: for each adjacent in-vocabulary token pair, the
    /// nearest vocabulary word to their combined direction. Out-of-vocabulary
    /// tokens are skipped, never errors.
    pub fn pairwise_extend(&self, tokens: &[String]) -> Vec<String> {
        let in_vocab: Vec<&String> = tokens.iter().filter(|t| self.vectors.contains(t)).collect();

        let mut extension = Vec::new();
        let mut seen = FxHashSet::default();
        for pair in in_vocab.windows(2) {
            let (a, b) = (pair[0].as_str(), pair[1].as_str());
            let (Some(va), Some(vb)) = (self.vectors.get(a), self.vectors.get(b)) else {
                continue;
            };
            let combined: Vec<f32> = va.iter().zip(vb.iter()).map(|(x, y)| x + y).collect();
            if let Some((word, _)) = self.vectors.nearest(&combined, 1, &[a, b]).into_iter().next()
            {
                if seen.insert(word.clone()) {
                    extension.push(word);
                }
            }
        }
        extension
    }

    /// Union of each in-vocabulary token's k nearest neighbors, first-seen
    /// order.
    pub fn candidate_terms(&self, tokens: &[String], k: usize) -> Vec<String> {
        let mut candidates = Vec::new();
        let mut seen = FxHashSet::default();
        for token in tokens {
            let Some(neighbors) = self.vectors.nearest_to_word(token, k) else {
                continue;
            };
            for (word, _) in neighbors {
                if seen.insert(word.clone()) {
                    candidates.push(word);
                }
            }
        }
        candidates
    }

    /// Rank candidates by average similarity to the base tokens and keep the
    /// top n. Candidates must be purely alphabetic and absent from the base
    /// set; survivors are lemmatized before truncation. Ordering is
    /// descending similarity with a stable first-seen tie-break.
    ///
    /// Fails with VocabularyMiss when no base token is in vocabulary.
    pub fn rank_and_select(
        &self,
        base: &[String],
        candidates: Vec<String>,
        n: usize,
    ) -> Result<Vec<String>, RankError> {
        let base_set: FxHashSet<&str> = base.iter().map(|s| s.as_str()).collect();

        let mut scored: Vec<(String, f32)> = Vec::new();
        for candidate in candidates {
            if !candidate.chars().all(|c| c.is_ascii_alphabetic()) {
                continue;
            }
            if base_set.contains(candidate.as_str()) {
                continue;
            }
            let sim = self.vectors.mean_similarity(&candidate, base)?;
            scored.push((candidate, sim));
        }

        // Stable sort: equal similarities keep first-seen candidate order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut selected = Vec::new();
        let mut seen = FxHashSet::default();
        for (candidate, _) in scored {
            if selected.len() >= n {
                break;
            }
            let lemma = self.normalizer.lemmatize(&candidate);
            if base_set.contains(lemma.as_str()) {
                continue;
            }
            if seen.insert(lemma.clone()) {
                selected.push(lemma);
            }
        }
        Ok(selected)
    }

    /// Full expansion pipeline. When every token is out of vocabulary the
    /// expansion set is empty rather than an error; scoring then falls back
    /// to the original tokens alone.
    pub fn expand(
        &self,
        query: &str,
        k: usize,
        n: usize,
        use_bridging: bool,
    ) -> Result<Expansion, RankError> {
        let original = self.tokenize(query)?;

        if !original.iter().any(|t| self.vectors.contains(t)) {
            debug!("every query token is out of vocabulary; empty expansion");
            return Ok(Expansion {
                original,
                expanded: Vec::new(),
            });
        }

        let base = if use_bridging {
            let mut base = original.clone();
            base.extend(self.pairwise_extend(&original));
            base
        } else {
            original.clone()
        };

        let candidates = self.candidate_terms(&base, k);
        if candidates.is_empty() {
            return Ok(Expansion {
                original,
                expanded: Vec::new(),
            });
        }

        let expanded = self.rank_and_select(&base, candidates, n)?;
        debug!(
            "expanded {} tokens into {} expansion terms",
            original.len(),
            expanded.len()
        );
        Ok(Expansion { original, expanded })
    }
}
