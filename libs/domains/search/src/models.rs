use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub const DEFAULT_THRESHOLD: f32 = 0.7;
pub const DEFAULT_COUNT: u32 = 10;

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}

fn default_count() -> u32 {
    DEFAULT_COUNT
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be blank".into()));
    }
    Ok(())
}

/// Free-text query matched against book embeddings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct SemanticSearchRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub key: String,
    #[serde(default = "default_threshold")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub match_threshold: f32,
    #[serde(default = "default_count")]
    #[validate(range(min = 1, max = 100))]
    pub match_count: u32,
}

impl SemanticSearchRequest {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            match_threshold: DEFAULT_THRESHOLD,
            match_count: DEFAULT_COUNT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct RecommendationRequest {
    #[serde(default = "default_threshold")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub similarity_threshold: f32,
    #[serde(default = "default_count")]
    #[validate(range(min = 1, max = 100))]
    pub top_n: u32,
}

impl Default for RecommendationRequest {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_THRESHOLD,
            top_n: DEFAULT_COUNT,
        }
    }
}

/// One row returned by the vector store functions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BookMatch {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub author_id: Option<Uuid>,
    pub similarity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IndexResponse {
    pub book_id: Uuid,
    pub dimension: usize,
    pub provider: String,
}
