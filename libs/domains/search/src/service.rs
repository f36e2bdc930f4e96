use domain_catalog::BookCatalog;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::embedding::EmbeddingProvider;
use crate::error::{SearchError, SearchResult};
use crate::gateway::VectorStore;
use crate::models::{BookMatch, IndexResponse, RecommendationRequest, SemanticSearchRequest};

fn validate<T: Validate>(input: &T) -> SearchResult<()> {
    input
        .validate()
        .map_err(|e| SearchError::Validation(e.to_string()))
}

fn non_empty(matches: Vec<BookMatch>) -> SearchResult<Vec<BookMatch>> {
    if matches.is_empty() {
        return Err(SearchError::NoMatches);
    }
    Ok(matches)
}

/// Semantic search and recommendations.
///
/// Similarity itself is computed by the vector store; this service only
/// produces query embeddings and relays the store's answers.
#[derive(Clone)]
pub struct SearchService {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    catalog: Arc<dyn BookCatalog>,
}

impl SearchService {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        catalog: Arc<dyn BookCatalog>,
    ) -> Self {
        Self {
            embedder,
            store,
            catalog,
        }
    }

    pub async fn semantic_search(
        &self,
        request: SemanticSearchRequest,
    ) -> SearchResult<Vec<BookMatch>> {
        validate(&request)?;

        let embedding = self.embedder.embed(request.key.trim()).await?;
        let matches = self
            .store
            .match_books(embedding, request.match_threshold, request.match_count)
            .await?;

        tracing::debug!(matches = matches.len(), "Semantic search finished");
        non_empty(matches)
    }

    pub async fn recommend(
        &self,
        user_id: Uuid,
        request: RecommendationRequest,
    ) -> SearchResult<Vec<BookMatch>> {
        validate(&request)?;

        let matches = self
            .store
            .recommend_books(user_id, request.similarity_threshold, request.top_n)
            .await?;

        tracing::debug!(user_id = %user_id, matches = matches.len(), "Recommendations fetched");
        non_empty(matches)
    }

    /// Embed a book's title and summary and store the vector on the book
    pub async fn index_book(&self, book_id: Uuid) -> SearchResult<IndexResponse> {
        let book = self.catalog.book(book_id).await?;
        let text = format!("{}. {}", book.title, book.summary);

        let embedding = self.embedder.embed(&text).await?;
        if embedding.iter().any(|value| !value.is_finite()) {
            return Err(SearchError::Embedding(format!(
                "{} returned non-finite values for book {}",
                self.embedder.name(),
                book_id
            )));
        }
        let dimension = embedding.len();
        self.catalog.store_embedding(book_id, embedding).await?;

        tracing::info!(book_id = %book_id, dimension, "Book embedding stored");
        Ok(IndexResponse {
            book_id,
            dimension,
            provider: self.embedder.name(),
        })
    }
}
