//! Relevance scoring - five weighting policies over a fetched corpus slice
//!
//! Documents are tokenized once at build time; term frequency and document
//! length are both measured in tokens. Scores are compared strictly
//! positive, descending.

use std::collections::HashMap;
use std::str::FromStr;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::error::RankError;
use crate::text::word_tokens;
use crate::vectors::WordVectors;

/// The closed set of scoring policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorePolicy {
    /// Conjunctive: product of per-token (tf / len); one missing token
    /// collapses the score to zero.
    Multiply,
    /// Disjunctive: sum of per-token (tf / len).
    Sum,
    /// As Sum, each addend scaled by the word's expansion weight.
    SumWeighted,
    /// Sum of (tf / len) * ln(corpus / df), zero-df tokens excluded.
    TfidfSum,
    /// As TfidfSum, each addend scaled by the word's expansion weight.
    TfidfSumWeighted,
}

impl ScorePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScorePolicy::Multiply => "multiply",
            ScorePolicy::Sum => "sum",
            ScorePolicy::SumWeighted => "sum-weighted",
            ScorePolicy::TfidfSum => "tfidf-sum",
            ScorePolicy::TfidfSumWeighted => "tfidf-sum-weighted",
        }
    }

    pub fn is_weighted(&self) -> bool {
        matches!(self, ScorePolicy::SumWeighted | ScorePolicy::TfidfSumWeighted)
    }
}

impl FromStr for ScorePolicy {
    type Err = RankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiply" => Ok(ScorePolicy::Multiply),
            "sum" => Ok(ScorePolicy::Sum),
            "sum-weighted" => Ok(ScorePolicy::SumWeighted),
            "tfidf-sum" => Ok(ScorePolicy::TfidfSum),
            "tfidf-sum-weighted" => Ok(ScorePolicy::TfidfSumWeighted),
            other => Err(RankError::UnknownScoringFunction(other.to_string())),
        }
    }
}

/// Parameters of the weighted policies: how much of the mass stays on the
/// original query tokens versus the expansion.
pub struct WeightingParams<'a> {
    /// Weight of an original token. `-1.0` selects raw-similarity mode:
    /// original tokens get 1, expansion tokens their normalized similarity.
    pub alpha: f64,
    pub original_tokens: &'a [String],
    pub expansion_tokens: &'a [String],
    pub vectors: &'a WordVectors,
}

impl WeightingParams<'_> {
    /// Weight of one scored word.
    ///
    /// Expansion weights are normalized by the summed similarity of all
    /// pure-expansion words to the original tokens; a zero denominator is
    /// a degenerate weighting, not a silent division.
    pub fn word_value(&self, word: &str) -> Result<f64, RankError> {
        let original: FxHashSet<&str> =
            self.original_tokens.iter().map(|s| s.as_str()).collect();

        if original.contains(word) {
            return Ok(if self.alpha == -1.0 { 1.0 } else { self.alpha });
        }

        let mut denominator = 0.0f64;
        for token in self.expansion_tokens {
            if original.contains(token.as_str()) {
                continue;
            }
            denominator +=
                self.vectors.mean_similarity(token, self.original_tokens)? as f64;
        }
        if denominator == 0.0 {
            return Err(RankError::DegenerateWeighting);
        }

        let similarity =
            self.vectors.mean_similarity(word, self.original_tokens)? as f64;
        if self.alpha == -1.0 {
            Ok(similarity / denominator)
        } else {
            Ok((1.0 - self.alpha) * similarity / denominator)
        }
    }
}

struct DocStats {
    id: i64,
    length: usize,
    term_counts: FxHashMap<String, usize>,
}

/// Scores a fetched corpus slice against a token list.
pub struct RelevanceScorer {
    docs: Vec<DocStats>,
}

impl RelevanceScorer {
    /// Tokenize the fetched texts. Documents are kept in ascending id order
    /// so equal scores rank deterministically.
    pub fn build(texts: &HashMap<i64, String>) -> Self {
        let mut docs: Vec<DocStats> = texts
            .iter()
            .map(|(&id, text)| {
                let tokens = word_tokens(text);
                let length = tokens.len();
                let mut term_counts: FxHashMap<String, usize> = FxHashMap::default();
                for token in tokens {
                    *term_counts.entry(token).or_insert(0) += 1;
                }
                DocStats {
                    id,
                    length,
                    term_counts,
                }
            })
            .collect();
        docs.sort_by_key(|d| d.id);
        Self { docs }
    }

    /// Number of fetched documents containing each token, parallel to the
    /// input list.
    pub fn document_frequencies(&self, tokens: &[String]) -> Vec<usize> {
        tokens
            .iter()
            .map(|token| {
                self.docs
                    .iter()
                    .filter(|d| d.term_counts.contains_key(token))
                    .count()
            })
            .collect()
    }

    /// Score every fetched document and select the top `m` positives
    /// (`m = 0` means all positives).
    ///
    /// `corpus_doc_count` is the total corpus size used by the TF-IDF
    /// policies; `weights` must be present exactly for the weighted ones.
    pub fn score(
        &self,
        tokens: &[String],
        policy: ScorePolicy,
        corpus_doc_count: usize,
        m: usize,
        weights: Option<&WeightingParams>,
    ) -> Result<Vec<(i64, f64)>, RankError> {
        if tokens.is_empty() {
            return Err(RankError::input("cannot score an empty token list"));
        }
        if self.docs.is_empty() {
            return Err(RankError::NoRelevantDocuments);
        }
        match (policy.is_weighted(), weights.is_some()) {
            (true, false) => {
                return Err(RankError::ArgumentMismatch {
                    policy: policy.as_str().to_string(),
                    reason: "weighting parameters required".to_string(),
                })
            }
            (false, true) => {
                return Err(RankError::ArgumentMismatch {
                    policy: policy.as_str().to_string(),
                    reason: "weighting parameters not accepted".to_string(),
                })
            }
            _ => {}
        }

        let scores = match policy {
            ScorePolicy::Multiply => self.score_unweighted(tokens, true),
            ScorePolicy::Sum => self.score_unweighted(tokens, false),
            ScorePolicy::SumWeighted => {
                self.score_sum_weighted(tokens, weights.unwrap())?
            }
            ScorePolicy::TfidfSum => self.score_tfidf(tokens, corpus_doc_count, None)?,
            ScorePolicy::TfidfSumWeighted => {
                self.score_tfidf(tokens, corpus_doc_count, weights)?
            }
        };

        debug!("scored {} documents under {}", scores.len(), policy.as_str());
        Ok(select_top(scores, m))
    }

    fn score_unweighted(&self, tokens: &[String], multiply: bool) -> Vec<(i64, f64)> {
        self.docs
            .iter()
            .map(|doc| {
                if doc.length == 0 {
                    return (doc.id, 0.0);
                }
                let mut score = if multiply { 1.0 } else { 0.0 };
                for token in tokens {
                    let tf = doc.term_counts.get(token).copied().unwrap_or(0) as f64;
                    let p = tf / doc.length as f64;
                    if multiply {
                        score *= p;
                    } else {
                        score += p;
                    }
                }
                (doc.id, score)
            })
            .collect()
    }

    fn score_sum_weighted(
        &self,
        tokens: &[String],
        weights: &WeightingParams,
    ) -> Result<Vec<(i64, f64)>, RankError> {
        let mut scores = Vec::with_capacity(self.docs.len());
        for doc in &self.docs {
            if doc.length == 0 {
                scores.push((doc.id, 0.0));
                continue;
            }
            let mut score = 0.0;
            for token in tokens {
                let tf = doc.term_counts.get(token).copied().unwrap_or(0) as f64;
                if tf == 0.0 {
                    continue;
                }
                score += (tf / doc.length as f64) * weights.word_value(token)?;
            }
            scores.push((doc.id, score));
        }
        Ok(scores)
    }

    fn score_tfidf(
        &self,
        tokens: &[String],
        corpus_doc_count: usize,
        weights: Option<&WeightingParams>,
    ) -> Result<Vec<(i64, f64)>, RankError> {
        // Zero-df tokens are dropped up front; they must never reach the
        // logarithm below.
        let frequencies = self.document_frequencies(tokens);
        let scored_tokens: Vec<(&str, f64)> = tokens
            .iter()
            .zip(frequencies)
            .filter(|(_, df)| *df > 0)
            .map(|(token, df)| {
                let idf = (corpus_doc_count as f64 / df as f64).ln();
                (token.as_str(), idf)
            })
            .collect();

        let mut scores = Vec::with_capacity(self.docs.len());
        for doc in &self.docs {
            if doc.length == 0 {
                scores.push((doc.id, 0.0));
                continue;
            }
            let mut score = 0.0;
            for (token, idf) in &scored_tokens {
                let tf = doc.term_counts.get(*token).copied().unwrap_or(0) as f64;
                if tf == 0.0 {
                    continue;
                }
                let contribution = (tf / doc.length as f64) * idf;
                score += match weights {
                    Some(w) => contribution * w.word_value(token)?,
                    None => contribution,
                };
            }
            scores.push((doc.id, score));
        }
        Ok(scores)
    }
}

/// Keep the strictly positive scores, descending; `m = 0` returns all of
/// them, otherwise the first `m`.
pub fn select_top(scores: Vec<(i64, f64)>, m: usize) -> Vec<(i64, f64)> {
    let mut positives: Vec<(i64, f64)> =
        scores.into_iter().filter(|(_, s)| *s > 0.0).collect();
    positives.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    if m > 0 {
        positives.truncate(m);
    }
    positives
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> HashMap<i64, String> {
        HashMap::from([
            (1, "the cat sat on the mat".to_string()),
            (2, "the dog sat on the log".to_string()),
        ])
    }

    #[test]
    fn policy_names_parse() {
        assert_eq!("sum".parse::<ScorePolicy>().unwrap(), ScorePolicy::Sum);
        assert_eq!(
            "tfidf-sum-weighted".parse::<ScorePolicy>().unwrap(),
            ScorePolicy::TfidfSumWeighted
        );
        assert!(matches!(
            "bm25".parse::<ScorePolicy>(),
            Err(RankError::UnknownScoringFunction(_))
        ));
    }

    #[test]
    fn sum_scores_cat_scenario() {
        let scorer = RelevanceScorer::build(&corpus());
        let tokens = vec!["cat".to_string()];
        let top = scorer
            .score(&tokens, ScorePolicy::Sum, 2, 1, None)
            .unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].0, 1);
        assert!((top[0].1 - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn multiply_collapses_on_missing_token() {
        let scorer = RelevanceScorer::build(&corpus());
        let tokens = vec!["cat".to_string(), "log".to_string()];
        let top = scorer
            .score(&tokens, ScorePolicy::Multiply, 2, 0, None)
            .unwrap();
        // neither document contains both tokens
        assert!(top.is_empty());
    }

    #[test]
    fn multiply_scores_conjunctive_match() {
        let scorer = RelevanceScorer::build(&corpus());
        let tokens = vec!["cat".to_string(), "mat".to_string()];
        let top = scorer
            .score(&tokens, ScorePolicy::Multiply, 2, 0, None)
            .unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].0, 1);
        assert!((top[0].1 - 1.0 / 36.0).abs() < 1e-12);
    }

    #[test]
    fn sum_scores_are_never_negative() {
        let scorer = RelevanceScorer::build(&corpus());
        let tokens = vec!["cat".to_string(), "dog".to_string(), "sat".to_string()];
        let top = scorer
            .score(&tokens, ScorePolicy::Sum, 2, 0, None)
            .unwrap();
        assert!(top.iter().all(|(_, s)| *s > 0.0));
    }

    #[test]
    fn tfidf_contribution_matches_reference_value() {
        // tf = 3 occurrences of one token in a 100-token document,
        // corpus of 10 documents, df = 2
        let filler = "word ".repeat(97);
        let texts = HashMap::from([
            (1, format!("{filler}cat cat cat")),
            (2, "cat elsewhere".to_string()),
        ]);
        let scorer = RelevanceScorer::build(&texts);
        let tokens = vec!["cat".to_string()];
        let scores = scorer
            .score(&tokens, ScorePolicy::TfidfSum, 10, 0, None)
            .unwrap();
        let doc1 = scores.iter().find(|(id, _)| *id == 1).unwrap();
        let expected = (3.0 / 100.0) * (10.0f64 / 2.0).ln();
        assert!((doc1.1 - expected).abs() < 1e-9);
        assert!((expected - 0.0483).abs() < 1e-4);
    }

    #[test]
    fn tfidf_ignores_zero_frequency_tokens() {
        let scorer = RelevanceScorer::build(&corpus());
        let with_ghost = vec!["cat".to_string(), "zeppelin".to_string()];
        let without = vec!["cat".to_string()];
        let a = scorer
            .score(&with_ghost, ScorePolicy::TfidfSum, 2, 0, None)
            .unwrap();
        let b = scorer
            .score(&without, ScorePolicy::TfidfSum, 2, 0, None)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_corpus_match_is_an_error() {
        let scorer = RelevanceScorer::build(&HashMap::new());
        let tokens = vec!["cat".to_string()];
        assert!(matches!(
            scorer.score(&tokens, ScorePolicy::Sum, 0, 0, None),
            Err(RankError::NoRelevantDocuments)
        ));
    }

    #[test]
    fn weighted_policy_requires_weights() {
        let scorer = RelevanceScorer::build(&corpus());
        let tokens = vec!["cat".to_string()];
        assert!(matches!(
            scorer.score(&tokens, ScorePolicy::SumWeighted, 2, 0, None),
            Err(RankError::ArgumentMismatch { .. })
        ));
    }

    #[test]
    fn unweighted_policy_rejects_weights() {
        let scorer = RelevanceScorer::build(&corpus());
        let tokens = vec!["cat".to_string()];
        let vectors = WordVectors::from_pairs(vec![("cat", vec![1.0, 0.0])]);
        let originals = vec!["cat".to_string()];
        let params = WeightingParams {
            alpha: 0.7,
            original_tokens: &originals,
            expansion_tokens: &[],
            vectors: &vectors,
        };
        assert!(matches!(
            scorer.score(&tokens, ScorePolicy::Sum, 2, 0, Some(&params)),
            Err(RankError::ArgumentMismatch { .. })
        ));
    }

    #[test]
    fn select_top_bounds_and_order() {
        let scores = vec![(1, 0.2), (2, -0.1), (3, 0.9), (4, 0.0), (5, 0.5)];
        let top = select_top(scores.clone(), 2);
        assert_eq!(top, vec![(3, 0.9), (5, 0.5)]);
        let all = select_top(scores, 0);
        assert_eq!(all, vec![(3, 0.9), (5, 0.5), (1, 0.2)]);
    }

    fn weighting_fixture() -> (WordVectors, Vec<String>, Vec<String>) {
        let vectors = WordVectors::from_pairs(vec![
            ("cat", vec![1.0, 0.0]),
            ("feline", vec![1.0, 0.0]),
            ("kitten", vec![0.0, 1.0]),
        ]);
        let originals = vec!["cat".to_string()];
        let expansion = vec!["feline".to_string(), "kitten".to_string()];
        (vectors, originals, expansion)
    }

    #[test]
    fn word_value_splits_mass_between_original_and_expansion() {
        let (vectors, originals, expansion) = weighting_fixture();
        let params = WeightingParams {
            alpha: 0.7,
            original_tokens: &originals,
            expansion_tokens: &expansion,
            vectors: &vectors,
        };
        assert!((params.word_value("cat").unwrap() - 0.7).abs() < 1e-9);
        // feline carries the whole (1 - alpha) share: sim(feline, cat) = 1,
        // sim(kitten, cat) = 0, so the denominator is 1
        assert!((params.word_value("feline").unwrap() - 0.3).abs() < 1e-6);
        assert!(params.word_value("kitten").unwrap().abs() < 1e-6);
    }

    #[test]
    fn word_value_raw_similarity_mode() {
        let (vectors, originals, expansion) = weighting_fixture();
        let params = WeightingParams {
            alpha: -1.0,
            original_tokens: &originals,
            expansion_tokens: &expansion,
            vectors: &vectors,
        };
        assert!((params.word_value("cat").unwrap() - 1.0).abs() < 1e-9);
        assert!((params.word_value("feline").unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn word_value_zero_denominator_is_degenerate() {
        let vectors = WordVectors::from_pairs(vec![
            ("cat", vec![1.0, 0.0]),
            ("kitten", vec![0.0, 1.0]),
        ]);
        let originals = vec!["cat".to_string()];
        let expansion = vec!["kitten".to_string()];
        let params = WeightingParams {
            alpha: 0.7,
            original_tokens: &originals,
            expansion_tokens: &expansion,
            vectors: &vectors,
        };
        assert!(matches!(
            params.word_value("kitten"),
            Err(RankError::DegenerateWeighting)
        ));
    }
}
