//! Canned embedding oracle for tests and offline runs

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::RankError;

use super::EmbeddingOracle;

/// Oracle returning pre-registered vectors keyed by text. Unknown text is a
/// collaborator failure, same surface as a real oracle going away.
#[derive(Default)]
pub struct CannedOracle {
    vectors: HashMap<String, Vec<f32>>,
}

impl CannedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, text: &str, vector: Vec<f32>) {
        self.vectors.insert(text.to_string(), vector);
    }
}

#[async_trait]
impl EmbeddingOracle for CannedOracle {
    async fn embed(&self, text: &str, _language: &str) -> Result<Vec<f32>, RankError> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| RankError::collaborator(format!("no canned embedding for: {text}")))
    }
}
