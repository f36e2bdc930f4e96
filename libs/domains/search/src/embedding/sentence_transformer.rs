use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;
use super::pooling::{l2_normalize, mean_pool};
use crate::error::{SearchError, SearchResult};

pub const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

#[derive(Debug, Clone, PartialEq)]
pub struct SentenceTransformerConfig {
    pub base_url: String,
    pub model: String,
    pub api_token: Option<String>,
    /// L2-normalise the pooled vector
    pub normalize: bool,
}

impl Default for SentenceTransformerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_INFERENCE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_token: None,
            normalize: true,
        }
    }
}

impl SentenceTransformerConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Sentence-transformers encoder behind a feature-extraction HTTP endpoint.
///
/// Servers answer either with token-level hidden states or with an already
/// pooled vector depending on the model's pipeline; both are accepted.
pub struct SentenceTransformerProvider {
    client: Client,
    config: SentenceTransformerConfig,
}

impl SentenceTransformerProvider {
    pub fn new(config: SentenceTransformerConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/pipeline/feature-extraction/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[derive(Debug, Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a str,
    options: InferenceOptions,
}

#[derive(Debug, Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeatureExtraction {
    Pooled(Vec<f32>),
    Tokens(Vec<Vec<f32>>),
    Batch(Vec<Vec<Vec<f32>>>),
}

impl FeatureExtraction {
    fn into_sentence_vector(self) -> SearchResult<Vec<f32>> {
        match self {
            FeatureExtraction::Pooled(vector) if vector.is_empty() => Err(
                SearchError::Embedding("Encoder returned an empty vector".to_string()),
            ),
            FeatureExtraction::Pooled(vector) => Ok(vector),
            FeatureExtraction::Tokens(tokens) => mean_pool(&tokens),
            FeatureExtraction::Batch(batch) => {
                let tokens = batch.into_iter().next().ok_or_else(|| {
                    SearchError::Embedding("Encoder returned an empty batch".to_string())
                })?;
                mean_pool(&tokens)
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for SentenceTransformerProvider {
    fn name(&self) -> String {
        format!("sentence-transformers/{}", self.config.model.rsplit('/').next().unwrap_or_default())
    }

    async fn embed(&self, text: &str) -> SearchResult<Vec<f32>> {
        let request = FeatureExtractionRequest {
            inputs: text,
            options: InferenceOptions {
                wait_for_model: true,
            },
        };

        let mut builder = self.client.post(self.endpoint()).json(&request);
        if let Some(token) = &self.config.api_token {
            builder = builder.bearer_auth(token);
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SearchError::Embedding(format!(
                "Inference API error ({}): {}",
                status, error_text
            )));
        }

        let output: FeatureExtraction = response.json().await?;
        let mut vector = output.into_sentence_vector()?;
        if self.config.normalize {
            l2_normalize(&mut vector);
        }

        tracing::debug!(model = %self.config.model, dimension = vector.len(), "Embedded text");
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL_PATH: &str = "/pipeline/feature-extraction/sentence-transformers/all-MiniLM-L6-v2";

    fn provider(server: &MockServer, normalize: bool, token: Option<&str>) -> SentenceTransformerProvider {
        SentenceTransformerProvider::new(SentenceTransformerConfig {
            normalize,
            api_token: token.map(str::to_string),
            ..SentenceTransformerConfig::default().with_base_url(server.uri())
        })
    }

    #[tokio::test]
    async fn test_token_states_are_mean_pooled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(body_json(json!({
                "inputs": "a city of memory",
                "options": {"wait_for_model": true}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([[1.0, 0.0], [3.0, 2.0]])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let vector = provider(&server, false, None)
            .embed("a city of memory")
            .await
            .unwrap();
        assert_eq!(vector, vec![2.0, 1.0]);
    }

    #[tokio::test]
    async fn test_batched_states_are_pooled_and_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(header("authorization", "Bearer hf_secret"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([[[3.0, 0.0], [3.0, 8.0]]])),
            )
            .mount(&server)
            .await;

        let vector = provider(&server, true, Some("hf_secret"))
            .embed("lighthouse")
            .await
            .unwrap();
        assert!((vector[0] - 0.6).abs() < 1e-6);
        assert!((vector[1] - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_pooled_vector_passes_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([0.5, 0.25, 0.125])))
            .mount(&server)
            .await;

        let vector = provider(&server, false, None).embed("tides").await.unwrap();
        assert_eq!(vector, vec![0.5, 0.25, 0.125]);
    }

    #[tokio::test]
    async fn test_api_error_is_embedding_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model is loading"))
            .mount(&server)
            .await;

        let err = provider(&server, true, None).embed("tides").await.unwrap_err();
        assert!(matches!(err, SearchError::Embedding(ref msg) if msg.contains("model is loading")));
    }

    #[tokio::test]
    async fn test_ragged_states_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([[1.0, 2.0], [1.0]])))
            .mount(&server)
            .await;

        assert!(provider(&server, true, None).embed("tides").await.is_err());
    }

    #[test]
    fn test_name_uses_short_model() {
        let provider = SentenceTransformerProvider::new(SentenceTransformerConfig::default());
        assert_eq!(provider.name(), "sentence-transformers/all-MiniLM-L6-v2");
    }
}
