use async_trait::async_trait;

use crate::error::SearchResult;

/// Turns text into a fixed-length vector.
///
/// One text per call; there is no batching or caching at this level.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider and model, used in logs and index responses
    fn name(&self) -> String;

    async fn embed(&self, text: &str) -> SearchResult<Vec<f32>>;
}
