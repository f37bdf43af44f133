//! Retrieval service - the exposed operations over injected collaborators
//!
//! Holds the word-vector model, the normalization pipeline, the corpus
//! store, and the embedding oracle as explicit handles; no global state.
//! Every operation builds its own working set, so concurrent reads are
//! safe. Concurrent similarity updates against one corpus can race (both
//! snapshot before either write); serializing writes is the store's concern.

use tracing::info;

use crate::embedding::EmbeddingOracle;
use crate::error::RankError;
use crate::expand::{Expansion, TokenExpander};
use crate::score::{RelevanceScorer, ScorePolicy, WeightingParams};
use crate::similarity::{Metric, SimilarityEdge, SimilarityIndex};
use crate::store::CorpusStore;
use crate::text::Normalizer;
use crate::vectors::WordVectors;

/// Ranking parameters, usually loaded from config.
#[derive(Debug, Clone)]
pub struct RankingOptions {
    /// Neighbors fetched per token during expansion.
    pub expansion_k: usize,
    /// Expansion terms kept after ranking.
    pub expansion_n: usize,
    /// Bridge adjacent token pairs before gathering candidates.
    pub bridging: bool,
    /// Scoring policy for retrieval.
    pub policy: ScorePolicy,
    /// Weight of original tokens under the weighted policies.
    pub alpha: f64,
}

impl Default for RankingOptions {
    fn default() -> Self {
        Self {
            expansion_k: 10,
            expansion_n: 5,
            bridging: false,
            policy: ScorePolicy::TfidfSum,
            alpha: 0.7,
        }
    }
}

/// Result of a similarity update.
#[derive(Debug)]
pub struct SimilarityUpdate {
    pub embedding: Vec<f32>,
    pub added_edges: Vec<SimilarityEdge>,
    /// Ids that were in the working set before insertion.
    pub existing_ids: Vec<i64>,
}

pub struct RetrievalService {
    vectors: WordVectors,
    normalizer: Normalizer,
    store: Box<dyn CorpusStore>,
    oracle: Box<dyn EmbeddingOracle>,
    options: RankingOptions,
    /// Language the loaded linguistic resources cover.
    language: String,
}

impl RetrievalService {
    pub fn new(
        vectors: WordVectors,
        normalizer: Normalizer,
        store: Box<dyn CorpusStore>,
        oracle: Box<dyn EmbeddingOracle>,
        options: RankingOptions,
        language: String,
    ) -> Self {
        Self {
            vectors,
            normalizer,
            store,
            oracle,
            options,
            language,
        }
    }

    /// Reject malformed input before any collaborator call.
    fn validate_query(&self, query: &str, language: &str) -> Result<(), RankError> {
        if query.trim().is_empty() {
            return Err(RankError::input("missing input: query"));
        }
        if query.contains('\'') || query.contains('"') {
            return Err(RankError::input("query must not contain quotation marks"));
        }
        if !language.eq_ignore_ascii_case(&self.language) {
            return Err(RankError::input(format!(
                "unsupported language: {language} (resources loaded for {})",
                self.language
            )));
        }
        Ok(())
    }

    /// Expand a query into original and expansion tokens.
    pub fn expand_query(&self, query: &str, language: &str) -> Result<Expansion, RankError> {
        self.validate_query(query, language)?;
        let expander = TokenExpander::new(&self.vectors, &self.normalizer);
        expander.expand(
            query,
            self.options.expansion_k,
            self.options.expansion_n,
            self.options.bridging,
        )
    }

    /// Rank corpus documents against an expanded query. `m = 0` returns all
    /// positive-scoring documents.
    pub fn retrieve_documents(
        &self,
        query: &str,
        m: usize,
        language: &str,
    ) -> Result<Vec<(i64, f64)>, RankError> {
        let expansion = self.expand_query(query, language)?;

        let mut tokens = expansion.original.clone();
        tokens.extend(expansion.expanded.iter().cloned());

        let texts = self.store.fetch_texts_matching(&tokens)?;
        if texts.is_empty() {
            return Err(RankError::NoRelevantDocuments);
        }
        let scorer = RelevanceScorer::build(&texts);
        let corpus_doc_count = self.store.document_count()?;

        let ranked = if self.options.policy.is_weighted() {
            let weights = WeightingParams {
                alpha: self.options.alpha,
                original_tokens: &expansion.original,
                expansion_tokens: &expansion.expanded,
                vectors: &self.vectors,
            };
            scorer.score(&tokens, self.options.policy, corpus_doc_count, m, Some(&weights))?
        } else {
            scorer.score(&tokens, self.options.policy, corpus_doc_count, m, None)?
        };

        info!(
            "retrieved {} documents for {} query tokens",
            ranked.len(),
            tokens.len()
        );
        Ok(ranked)
    }

    /// Embed one document and record its similarity edges against the
    /// current corpus. Everything is computed before anything is persisted.
    pub async fn update_similarities(
        &mut self,
        document_id: i64,
        language: &str,
    ) -> Result<SimilarityUpdate, RankError> {
        let (ids, vectors) = self.store.all_embeddings()?;
        let existing_ids = ids.clone();
        let mut index = SimilarityIndex::new(ids, vectors)?;

        let record = self.store.document_record(document_id)?;
        let text = record
            .best_text()
            .ok_or_else(|| RankError::input(format!("no text stored for document {document_id}")))?
            .to_string();

        let embedding = self.oracle.embed(&text, language).await?;

        let added_edges = index.add_document(document_id, embedding.clone());

        self.store.persist_embedding(document_id, &embedding)?;
        self.store.persist_similarity_edges(&added_edges)?;
        self.store.flush()?;

        info!(
            "added document {} with {} similarity edges",
            document_id,
            added_edges.len()
        );
        Ok(SimilarityUpdate {
            embedding,
            added_edges,
            existing_ids,
        })
    }

    /// Paginated neighbors of one document, descending by stored score.
    /// `k = 0` returns everything from `offset`.
    pub fn get_similarities(
        &self,
        document_id: i64,
        k: usize,
        offset: usize,
    ) -> Result<Vec<(i64, f64)>, RankError> {
        let rows = self.store.similarities_from(document_id)?;
        let page: Vec<(i64, f64)> = if k == 0 {
            rows.into_iter().skip(offset).collect()
        } else {
            rows.into_iter().skip(offset).take(k).collect()
        };
        Ok(page)
    }

    /// Recompute the k nearest documents from the persisted embeddings,
    /// bypassing the stored edges. Ordering follows the metric's own
    /// convention. The query document is never its own neighbor.
    pub fn nearest_documents(
        &self,
        document_id: i64,
        k: usize,
        metric: Metric,
    ) -> Result<Vec<(i64, f64)>, RankError> {
        let (ids, vectors) = self.store.all_embeddings()?;
        let index = SimilarityIndex::new(ids, vectors)?;

        let target = index
            .embedding_for(document_id)
            .ok_or_else(|| {
                RankError::collaborator(format!("no embedding stored for document {document_id}"))
            })?
            .to_vec();

        let fetch = if k == 0 { index.len() } else { k + 1 };
        let neighbors = index.k_nearest_neighbors(&target, fetch, metric)?;
        let mut result: Vec<(i64, f64)> = neighbors
            .into_iter()
            .filter(|(id, _)| *id != document_id)
            .collect();
        if k > 0 {
            result.truncate(k);
        }
        Ok(result)
    }

    /// Texts of the given documents, for display next to ranked ids.
    pub fn fetch_texts(
        &self,
        ids: &[i64],
    ) -> Result<std::collections::HashMap<i64, String>, RankError> {
        self.store.fetch_texts_by_ids(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::CannedOracle;
    use crate::store::{DocumentRecord, MemoryCorpusStore};

    fn word_model() -> WordVectors {
        WordVectors::from_pairs(vec![
            ("cat", vec![1.0, 0.0, 0.0]),
            ("feline", vec![0.95, 0.05, 0.0]),
            ("dog", vec![0.0, 1.0, 0.0]),
            ("mat", vec![0.2, 0.2, 0.9]),
        ])
    }

    fn record(id: i64, fulltext: &str) -> DocumentRecord {
        DocumentRecord {
            document_id: id,
            fulltext: Some(fulltext.to_string()),
            abstract_text: None,
            title: None,
        }
    }

    fn service(policy: ScorePolicy) -> RetrievalService {
        let mut store = MemoryCorpusStore::new();
        store.add_document(record(1, "the cat sat on the mat"));
        store.add_document(record(2, "the dog sat on the log"));
        RetrievalService::new(
            word_model(),
            Normalizer::english(),
            Box::new(store),
            Box::new(CannedOracle::new()),
            RankingOptions {
                expansion_k: 2,
                expansion_n: 1,
                bridging: false,
                policy,
                alpha: 0.7,
            },
            "en".to_string(),
        )
    }

    #[test]
    fn rejects_empty_and_quoted_queries() {
        let svc = service(ScorePolicy::Sum);
        assert!(matches!(
            svc.retrieve_documents("  ", 5, "en"),
            Err(RankError::Input(_))
        ));
        assert!(matches!(
            svc.retrieve_documents("cat \"mat\"", 5, "en"),
            Err(RankError::Input(_))
        ));
    }

    #[test]
    fn rejects_unknown_language() {
        let svc = service(ScorePolicy::Sum);
        assert!(matches!(
            svc.expand_query("cat", "de"),
            Err(RankError::Input(_))
        ));
    }

    #[test]
    fn expand_query_returns_original_and_expansion() {
        let svc = service(ScorePolicy::Sum);
        let expansion = svc.expand_query("cat mat", "en").unwrap();
        assert_eq!(expansion.original, vec!["cat", "mat"]);
        assert_eq!(expansion.expanded, vec!["feline"]);
    }

    #[test]
    fn retrieve_ranks_matching_documents() {
        let svc = service(ScorePolicy::Sum);
        let ranked = svc.retrieve_documents("cat", 1, "en").unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].0, 1);
        assert!((ranked[0].1 - 1.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn retrieve_with_oov_query_falls_back_to_lexical_match() {
        let mut store = MemoryCorpusStore::new();
        store.add_document(record(1, "zeppelin history"));
        let svc = RetrievalService::new(
            word_model(),
            Normalizer::english(),
            Box::new(store),
            Box::new(CannedOracle::new()),
            RankingOptions {
                policy: ScorePolicy::Sum,
                ..Default::default()
            },
            "en".to_string(),
        );
        let ranked = svc.retrieve_documents("zeppelin", 5, "en").unwrap();
        assert_eq!(ranked[0].0, 1);
    }

    #[test]
    fn retrieve_without_matches_is_no_relevant_documents() {
        let svc = service(ScorePolicy::Sum);
        assert!(matches!(
            svc.retrieve_documents("spaceship", 5, "en"),
            Err(RankError::NoRelevantDocuments)
        ));
    }

    #[tokio::test]
    async fn update_similarities_persists_embedding_and_edges() {
        let mut store = MemoryCorpusStore::new();
        store.add_document(record(30, "a brand new document"));
        store.add_embedding(10, vec![1.0, 0.0]);
        store.add_embedding(20, vec![0.0, 1.0]);
        let mut oracle = CannedOracle::new();
        oracle.register("a brand new document", vec![1.0, 1.0]);

        let mut svc = RetrievalService::new(
            word_model(),
            Normalizer::english(),
            Box::new(store),
            Box::new(oracle),
            RankingOptions::default(),
            "en".to_string(),
        );

        let update = svc.update_similarities(30, "en").await.unwrap();
        assert_eq!(update.embedding, vec![1.0, 1.0]);
        assert_eq!(update.existing_ids, vec![10, 20]);
        assert_eq!(update.added_edges.len(), 4);

        // the persisted edges back the paginated read
        let neighbors = svc.get_similarities(30, 1, 0).unwrap();
        assert_eq!(neighbors.len(), 1);
        let rest = svc.get_similarities(30, 0, 1).unwrap();
        assert_eq!(rest.len(), 1);
    }

    #[tokio::test]
    async fn update_similarities_on_empty_corpus_adds_no_edges() {
        let mut store = MemoryCorpusStore::new();
        store.add_document(record(1, "first ever document"));
        let mut oracle = CannedOracle::new();
        oracle.register("first ever document", vec![0.5, 0.5]);

        let mut svc = RetrievalService::new(
            word_model(),
            Normalizer::english(),
            Box::new(store),
            Box::new(oracle),
            RankingOptions::default(),
            "en".to_string(),
        );

        let update = svc.update_similarities(1, "en").await.unwrap();
        assert!(update.added_edges.is_empty());
        assert!(update.existing_ids.is_empty());
    }

    #[test]
    fn nearest_documents_recomputes_from_embeddings() {
        let mut store = MemoryCorpusStore::new();
        store.add_embedding(10, vec![1.0, 0.0]);
        store.add_embedding(20, vec![0.0, 1.0]);
        store.add_embedding(30, vec![0.9, 0.1]);
        let svc = RetrievalService::new(
            word_model(),
            Normalizer::english(),
            Box::new(store),
            Box::new(CannedOracle::new()),
            RankingOptions::default(),
            "en".to_string(),
        );

        let by_cosine = svc.nearest_documents(10, 1, Metric::Cosine).unwrap();
        assert_eq!(by_cosine[0].0, 30);

        let all = svc.nearest_documents(10, 0, Metric::Euclidean).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].0, 30);
        assert!(all.iter().all(|(id, _)| *id != 10));
    }

    #[tokio::test]
    async fn update_similarities_requires_stored_text() {
        let mut store = MemoryCorpusStore::new();
        store.add_document(DocumentRecord {
            document_id: 5,
            fulltext: None,
            abstract_text: None,
            title: None,
        });
        let mut svc = RetrievalService::new(
            word_model(),
            Normalizer::english(),
            Box::new(store),
            Box::new(CannedOracle::new()),
            RankingOptions::default(),
            "en".to_string(),
        );
        assert!(matches!(
            svc.update_similarities(5, "en").await,
            Err(RankError::Input(_))
        ));
    }
}
