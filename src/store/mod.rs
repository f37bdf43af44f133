//! Corpus store collaborator - texts, embeddings, and similarity edges
//!
//! The ranking core never owns persistence; it talks to a `CorpusStore`
//! handle injected at construction. `JsonCorpusStore` is the file-backed
//! implementation; `MemoryCorpusStore` backs tests and embedded use.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RankError;
use crate::similarity::SimilarityEdge;
use crate::text::word_tokens;

/// One stored document's text fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_id: i64,
    #[serde(default)]
    pub fulltext: Option<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl DocumentRecord {
    /// Best available text, fulltext > abstract > title. `None` when every
    /// field is empty.
    pub fn best_text(&self) -> Option<&str> {
        [&self.fulltext, &self.abstract_text, &self.title]
            .into_iter()
            .filter_map(|f| f.as_deref())
            .find(|t| !t.is_empty())
    }

    /// Text used for lexical scoring; empty string when nothing is stored.
    pub fn scoring_text(&self) -> &str {
        self.best_text().unwrap_or("")
    }
}

/// Synchronous persistence collaborator. The mutating calls buffer; `flush`
/// makes the whole operation's writes durable at once, so a failed
/// operation persists nothing.
pub trait CorpusStore: Send + Sync {
    fn fetch_texts_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, String>, RankError>;

    /// Texts of every document containing at least one of the given tokens.
    fn fetch_texts_matching(&self, tokens: &[String]) -> Result<HashMap<i64, String>, RankError>;

    /// Total corpus size, the numerator of IDF.
    fn document_count(&self) -> Result<usize, RankError>;

    /// Snapshot of all persisted embeddings as parallel (ids, vectors).
    fn all_embeddings(&self) -> Result<(Vec<i64>, Vec<Vec<f32>>), RankError>;

    fn document_record(&self, id: i64) -> Result<DocumentRecord, RankError>;

    fn persist_embedding(&mut self, id: i64, vector: &[f32]) -> Result<(), RankError>;

    fn persist_similarity_edges(&mut self, edges: &[SimilarityEdge]) -> Result<(), RankError>;

    /// Directed rows with the given source, descending by score.
    fn similarities_from(&self, source_id: i64) -> Result<Vec<(i64, f64)>, RankError>;

    fn flush(&mut self) -> Result<(), RankError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEmbedding {
    document_id: i64,
    vector: Vec<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CorpusFile {
    #[serde(default)]
    documents: Vec<DocumentRecord>,
    #[serde(default)]
    embeddings: Vec<StoredEmbedding>,
    #[serde(default)]
    edges: Vec<SimilarityEdge>,
}

/// File-backed corpus store: one JSON document holding texts, embeddings,
/// and edges. Loaded whole at open, written whole at flush.
pub struct JsonCorpusStore {
    path: PathBuf,
    data: CorpusFile,
}

impl JsonCorpusStore {
    /// Open an existing corpus file, or start empty when the file does not
    /// exist yet.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let data = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            CorpusFile::default()
        };
        info!(
            "Opened corpus store {} ({} documents, {} embeddings)",
            path.display(),
            data.documents.len(),
            data.embeddings.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    fn matches(record: &DocumentRecord, tokens: &FxHashSet<&str>) -> bool {
        word_tokens(record.scoring_text())
            .iter()
            .any(|t| tokens.contains(t.as_str()))
    }
}

impl CorpusStore for JsonCorpusStore {
    fn fetch_texts_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, String>, RankError> {
        let wanted: FxHashSet<i64> = ids.iter().copied().collect();
        Ok(self
            .data
            .documents
            .iter()
            .filter(|d| wanted.contains(&d.document_id))
            .map(|d| (d.document_id, d.scoring_text().to_string()))
            .collect())
    }

    fn fetch_texts_matching(&self, tokens: &[String]) -> Result<HashMap<i64, String>, RankError> {
        let token_set: FxHashSet<&str> = tokens.iter().map(|t| t.as_str()).collect();
        Ok(self
            .data
            .documents
            .iter()
            .filter(|d| Self::matches(d, &token_set))
            .map(|d| (d.document_id, d.scoring_text().to_string()))
            .collect())
    }

    fn document_count(&self) -> Result<usize, RankError> {
        Ok(self.data.documents.len())
    }

    fn all_embeddings(&self) -> Result<(Vec<i64>, Vec<Vec<f32>>), RankError> {
        let ids = self.data.embeddings.iter().map(|e| e.document_id).collect();
        let vectors = self.data.embeddings.iter().map(|e| e.vector.clone()).collect();
        Ok((ids, vectors))
    }

    fn document_record(&self, id: i64) -> Result<DocumentRecord, RankError> {
        self.data
            .documents
            .iter()
            .find(|d| d.document_id == id)
            .cloned()
            .ok_or_else(|| RankError::collaborator(format!("document not found: {id}")))
    }

    fn persist_embedding(&mut self, id: i64, vector: &[f32]) -> Result<(), RankError> {
        self.data.embeddings.push(StoredEmbedding {
            document_id: id,
            vector: vector.to_vec(),
        });
        Ok(())
    }

    fn persist_similarity_edges(&mut self, edges: &[SimilarityEdge]) -> Result<(), RankError> {
        self.data.edges.extend_from_slice(edges);
        Ok(())
    }

    fn similarities_from(&self, source_id: i64) -> Result<Vec<(i64, f64)>, RankError> {
        let mut rows: Vec<(i64, f64)> = self
            .data
            .edges
            .iter()
            .filter(|e| e.source_id == source_id)
            .map(|e| (e.target_id, e.score))
            .collect();
        rows.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(rows)
    }

    fn flush(&mut self) -> Result<(), RankError> {
        let content = serde_json::to_string_pretty(&self.data)
            .map_err(|e| RankError::collaborator(format!("serialize corpus: {e}")))?;
        std::fs::write(&self.path, content)
            .map_err(|e| RankError::collaborator(format!("write {}: {e}", self.path.display())))?;
        Ok(())
    }
}

/// In-memory corpus store, used by the service tests and embeddable as a
/// scratch corpus.
#[derive(Default)]
pub struct MemoryCorpusStore {
    documents: Vec<DocumentRecord>,
    embeddings: Vec<StoredEmbedding>,
    edges: Vec<SimilarityEdge>,
}

impl MemoryCorpusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&mut self, record: DocumentRecord) {
        self.documents.push(record);
    }

    pub fn add_embedding(&mut self, id: i64, vector: Vec<f32>) {
        self.embeddings.push(StoredEmbedding {
            document_id: id,
            vector,
        });
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

impl CorpusStore for MemoryCorpusStore {
    fn fetch_texts_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, String>, RankError> {
        let wanted: FxHashSet<i64> = ids.iter().copied().collect();
        Ok(self
            .documents
            .iter()
            .filter(|d| wanted.contains(&d.document_id))
            .map(|d| (d.document_id, d.scoring_text().to_string()))
            .collect())
    }

    fn fetch_texts_matching(&self, tokens: &[String]) -> Result<HashMap<i64, String>, RankError> {
        let token_set: FxHashSet<&str> = tokens.iter().map(|t| t.as_str()).collect();
        Ok(self
            .documents
            .iter()
            .filter(|d| JsonCorpusStore::matches(d, &token_set))
            .map(|d| (d.document_id, d.scoring_text().to_string()))
            .collect())
    }

    fn document_count(&self) -> Result<usize, RankError> {
        Ok(self.documents.len())
    }

    fn all_embeddings(&self) -> Result<(Vec<i64>, Vec<Vec<f32>>), RankError> {
        let ids = self.embeddings.iter().map(|e| e.document_id).collect();
        let vectors = self.embeddings.iter().map(|e| e.vector.clone()).collect();
        Ok((ids, vectors))
    }

    fn document_record(&self, id: i64) -> Result<DocumentRecord, RankError> {
        self.documents
            .iter()
            .find(|d| d.document_id == id)
            .cloned()
            .ok_or_else(|| RankError::collaborator(format!("document not found: {id}")))
    }

    fn persist_embedding(&mut self, id: i64, vector: &[f32]) -> Result<(), RankError> {
        self.embeddings.push(StoredEmbedding {
            document_id: id,
            vector: vector.to_vec(),
        });
        Ok(())
    }

    fn persist_similarity_edges(&mut self, edges: &[SimilarityEdge]) -> Result<(), RankError> {
        self.edges.extend_from_slice(edges);
        Ok(())
    }

    fn similarities_from(&self, source_id: i64) -> Result<Vec<(i64, f64)>, RankError> {
        let mut rows: Vec<(i64, f64)> = self
            .edges
            .iter()
            .filter(|e| e.source_id == source_id)
            .map(|e| (e.target_id, e.score))
            .collect();
        rows.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(rows)
    }

    fn flush(&mut self) -> Result<(), RankError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, fulltext: &str) -> DocumentRecord {
        DocumentRecord {
            document_id: id,
            fulltext: Some(fulltext.to_string()),
            abstract_text: None,
            title: None,
        }
    }

    #[test]
    fn best_text_falls_back_in_priority_order() {
        let mut r = DocumentRecord {
            document_id: 1,
            fulltext: Some(String::new()),
            abstract_text: Some("short abstract".to_string()),
            title: Some("a title".to_string()),
        };
        assert_eq!(r.best_text(), Some("short abstract"));
        r.abstract_text = None;
        assert_eq!(r.best_text(), Some("a title"));
        r.title = None;
        assert_eq!(r.best_text(), None);
    }

    #[test]
    fn matching_fetch_uses_token_containment() {
        let mut store = MemoryCorpusStore::new();
        store.add_document(record(1, "climate change treaty"));
        store.add_document(record(2, "fisheries regulation"));
        let texts = store
            .fetch_texts_matching(&["treaty".to_string()])
            .unwrap();
        assert_eq!(texts.len(), 1);
        assert!(texts.contains_key(&1));
    }

    #[test]
    fn similarities_sort_descending() {
        let mut store = MemoryCorpusStore::new();
        store
            .persist_similarity_edges(&[
                SimilarityEdge { source_id: 1, target_id: 2, score: 0.3 },
                SimilarityEdge { source_id: 1, target_id: 3, score: 0.9 },
                SimilarityEdge { source_id: 2, target_id: 1, score: 0.3 },
            ])
            .unwrap();
        let rows = store.similarities_from(1).unwrap();
        assert_eq!(rows, vec![(3, 0.9), (2, 0.3)]);
    }

    #[test]
    fn json_store_roundtrip() {
        let path = std::env::temp_dir().join("docrank-store-test.json");
        std::fs::remove_file(&path).ok();
        {
            let mut store = JsonCorpusStore::open(&path).unwrap();
            store.persist_embedding(7, &[0.1, 0.2]).unwrap();
            store
                .persist_similarity_edges(&[SimilarityEdge {
                    source_id: 7,
                    target_id: 8,
                    score: 0.5,
                }])
                .unwrap();
            store.flush().unwrap();
        }
        let store = JsonCorpusStore::open(&path).unwrap();
        let (ids, vectors) = store.all_embeddings().unwrap();
        assert_eq!(ids, vec![7]);
        assert_eq!(vectors[0], vec![0.1, 0.2]);
        assert_eq!(store.similarities_from(7).unwrap(), vec![(8, 0.5)]);
        std::fs::remove_file(&path).ok();
    }
}
