//! Search Domain
//!
//! Semantic search and recommendations over the book catalog. Query text is
//! turned into an embedding by an [`EmbeddingProvider`]; nearest-neighbour
//! search and recommendation ranking run inside the vector store and are
//! reached through its RPC functions ([`VectorStore`]).
//!
//! ```text
//! ┌─────────────────┐
//! │  SearchService  │
//! └───┬─────────┬───┘
//!     │         │
//! ┌───▼─────────────┐  ┌──────────────────┐
//! │EmbeddingProvider│  │   VectorStore    │
//! │  (trait)        │  │   (trait)        │
//! └───┬─────────────┘  └────────┬─────────┘
//!     │                         │
//! SentenceTransformer      RpcVectorStore
//! OpenAi                   (match_books, recommend_books)
//! ```

pub mod config;
pub mod embedding;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod service;

pub use config::{EmbeddingConfig, EmbeddingProviderKind, VectorStoreConfig};
pub use embedding::{
    EmbeddingProvider, OpenAiConfig, OpenAiProvider, SentenceTransformerConfig,
    SentenceTransformerProvider, l2_normalize, mean_pool,
};
pub use error::{SearchError, SearchResult};
pub use gateway::{RpcVectorStore, VectorStore};
pub use handlers::ApiDoc;
pub use models::{BookMatch, IndexResponse, RecommendationRequest, SemanticSearchRequest};
pub use service::SearchService;
