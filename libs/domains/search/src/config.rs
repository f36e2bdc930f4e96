use core_config::{ConfigError, FromEnv, env_flag, env_or_default, env_required};
use std::sync::Arc;
use strum::{Display, EnumString};

use crate::embedding::{
    EmbeddingProvider, OpenAiConfig, OpenAiProvider, SentenceTransformerConfig,
    SentenceTransformerProvider,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum EmbeddingProviderKind {
    #[default]
    SentenceTransformers,
    #[strum(serialize = "openai")]
    OpenAi,
}

/// Which encoder turns queries into vectors.
///
/// - `EMBEDDING_PROVIDER`: `sentence-transformers` (default) or `openai`
/// - `EMBEDDING_API_URL`, `EMBEDDING_MODEL`, `EMBEDDING_API_TOKEN`, `EMBEDDING_NORMALIZE`
/// - `OPENAI_API_KEY` (required for `openai`), `OPENAI_BASE_URL`, `OPENAI_EMBEDDING_MODEL`
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingConfig {
    SentenceTransformers(SentenceTransformerConfig),
    OpenAi(OpenAiConfig),
}

impl EmbeddingConfig {
    pub fn kind(&self) -> EmbeddingProviderKind {
        match self {
            EmbeddingConfig::SentenceTransformers(_) => EmbeddingProviderKind::SentenceTransformers,
            EmbeddingConfig::OpenAi(_) => EmbeddingProviderKind::OpenAi,
        }
    }

    pub fn build_provider(self) -> Arc<dyn EmbeddingProvider> {
        match self {
            EmbeddingConfig::SentenceTransformers(config) => {
                Arc::new(SentenceTransformerProvider::new(config))
            }
            EmbeddingConfig::OpenAi(config) => Arc::new(OpenAiProvider::new(config)),
        }
    }
}

impl FromEnv for EmbeddingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = env_or_default(
            "EMBEDDING_PROVIDER",
            &EmbeddingProviderKind::default().to_string(),
        );
        let kind: EmbeddingProviderKind = raw.parse().map_err(|_| ConfigError::Invalid {
            key: "EMBEDDING_PROVIDER".to_string(),
            details: format!("unknown provider '{}'", raw),
        })?;

        match kind {
            EmbeddingProviderKind::SentenceTransformers => {
                let defaults = SentenceTransformerConfig::default();
                Ok(EmbeddingConfig::SentenceTransformers(
                    SentenceTransformerConfig {
                        base_url: env_or_default("EMBEDDING_API_URL", &defaults.base_url),
                        model: env_or_default("EMBEDDING_MODEL", &defaults.model),
                        api_token: std::env::var("EMBEDDING_API_TOKEN")
                            .ok()
                            .filter(|token| !token.is_empty()),
                        normalize: env_flag("EMBEDDING_NORMALIZE", defaults.normalize)?,
                    },
                ))
            }
            EmbeddingProviderKind::OpenAi => {
                let defaults = OpenAiConfig::new(env_required("OPENAI_API_KEY")?);
                Ok(EmbeddingConfig::OpenAi(OpenAiConfig {
                    base_url: env_or_default("OPENAI_BASE_URL", &defaults.base_url),
                    model: env_or_default("OPENAI_EMBEDDING_MODEL", &defaults.model),
                    ..defaults
                }))
            }
        }
    }
}

/// Connection to the vector store's RPC functions.
///
/// - `VECTOR_STORE_URL`, `VECTOR_STORE_KEY`: required
/// - `VECTOR_STORE_MATCH_FN` (default `match_books`)
/// - `VECTOR_STORE_RECOMMEND_FN` (default `recommend_books`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorStoreConfig {
    pub url: String,
    pub api_key: String,
    pub match_function: String,
    pub recommend_function: String,
}

impl VectorStoreConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            match_function: "match_books".to_string(),
            recommend_function: "recommend_books".to_string(),
        }
    }
}

impl FromEnv for VectorStoreConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::new(env_required("VECTOR_STORE_URL")?, env_required("VECTOR_STORE_KEY")?);
        Ok(Self {
            match_function: env_or_default("VECTOR_STORE_MATCH_FN", &defaults.match_function),
            recommend_function: env_or_default(
                "VECTOR_STORE_RECOMMEND_FN",
                &defaults.recommend_function,
            ),
            ..defaults
        })
    }
}
