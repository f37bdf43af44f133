//! Embedding oracle - maps document text to a dense vector
//!
//! The model itself is external; the core only holds a handle. The HTTP
//! oracle talks to a text-embedding service; the canned oracle serves tests
//! and offline runs.

mod canned;
mod http;

pub use canned::CannedOracle;
pub use http::HttpEmbeddingOracle;

use async_trait::async_trait;

use crate::error::RankError;

/// Text-to-vector capability. Failure is a collaborator failure, surfaced
/// immediately with no retry inside the core.
#[async_trait]
pub trait EmbeddingOracle: Send + Sync {
    async fn embed(&self, text: &str, language: &str) -> Result<Vec<f32>, RankError>;
}
