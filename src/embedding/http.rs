//! HTTP embedding oracle

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RankError;

use super::EmbeddingOracle;

/// Client for a text-embedding service.
///
/// POSTs `{text, language}` and expects either `{"embedding": [...]}` or
/// `{"error": "..."}` in the response body.
pub struct HttpEmbeddingOracle {
    client: Client,
    url: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
    language: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Option<Vec<f32>>,
    error: Option<String>,
}

impl HttpEmbeddingOracle {
    pub fn new(url: String) -> Self {
        info!("Embedding oracle at {}", url);
        Self {
            client: Client::new(),
            url,
        }
    }
}

#[async_trait]
impl EmbeddingOracle for HttpEmbeddingOracle {
    async fn embed(&self, text: &str, language: &str) -> Result<Vec<f32>, RankError> {
        let request = EmbedRequest { text, language };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RankError::collaborator(format!("embedding service: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RankError::collaborator(format!(
                "embedding service returned {status}"
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| RankError::collaborator(format!("embedding response: {e}")))?;

        if let Some(error) = body.error {
            return Err(RankError::collaborator(format!(
                "embedding service error: {error}"
            )));
        }
        body.embedding
            .ok_or_else(|| RankError::collaborator("embedding missing from response".to_string()))
    }
}
