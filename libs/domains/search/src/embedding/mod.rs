mod openai;
mod pooling;
mod provider;
mod sentence_transformer;

pub use openai::{OpenAiConfig, OpenAiProvider};
pub use pooling::{l2_normalize, mean_pool};
pub use provider::EmbeddingProvider;
#[cfg(test)]
pub use provider::MockEmbeddingProvider;
pub use sentence_transformer::{SentenceTransformerConfig, SentenceTransformerProvider};
