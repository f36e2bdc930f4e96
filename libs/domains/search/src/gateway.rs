//! Client for the similarity functions hosted by the vector store.
//!
//! Both functions are exposed PostgREST style under `/rest/v1/rpc/{name}` and
//! answer with a JSON array of [`BookMatch`] rows.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::config::VectorStoreConfig;
use crate::error::{SearchError, SearchResult};
use crate::models::BookMatch;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Books whose embedding is at least `threshold` similar to `embedding`
    async fn match_books(
        &self,
        embedding: Vec<f32>,
        threshold: f32,
        count: u32,
    ) -> SearchResult<Vec<BookMatch>>;

    /// Recommendations computed by the store for a reader
    async fn recommend_books(
        &self,
        user_id: Uuid,
        threshold: f32,
        top_n: u32,
    ) -> SearchResult<Vec<BookMatch>>;
}

#[derive(Debug, Serialize)]
struct MatchArgs {
    query_embedding: Vec<f32>,
    match_threshold: f32,
    match_count: u32,
}

#[derive(Debug, Serialize)]
struct RecommendArgs {
    user_id: Uuid,
    similarity_threshold: f32,
    top_n: u32,
}

pub struct RpcVectorStore {
    client: Client,
    config: VectorStoreConfig,
}

impl RpcVectorStore {
    pub fn new(config: VectorStoreConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn call<A, T>(&self, function: &str, args: &A) -> SearchResult<T>
    where
        A: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!(
            "{}/rest/v1/rpc/{}",
            self.config.url.trim_end_matches('/'),
            function
        );

        let response = self
            .client
            .post(url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .json(args)
            .send()
            .await
            .map_err(|e| SearchError::Gateway(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(function, %status, "Vector store call failed");
            return Err(SearchError::Gateway(format!(
                "{} returned {}: {}",
                function, status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SearchError::Gateway(format!("Invalid {} response: {}", function, e)))
    }
}

#[async_trait]
impl VectorStore for RpcVectorStore {
    async fn match_books(
        &self,
        embedding: Vec<f32>,
        threshold: f32,
        count: u32,
    ) -> SearchResult<Vec<BookMatch>> {
        let args = MatchArgs {
            query_embedding: embedding,
            match_threshold: threshold,
            match_count: count,
        };
        self.call(&self.config.match_function, &args).await
    }

    async fn recommend_books(
        &self,
        user_id: Uuid,
        threshold: f32,
        top_n: u32,
    ) -> SearchResult<Vec<BookMatch>> {
        let args = RecommendArgs {
            user_id,
            similarity_threshold: threshold,
            top_n,
        };
        self.call(&self.config.recommend_function, &args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> RpcVectorStore {
        RpcVectorStore::new(VectorStoreConfig::new(server.uri(), "service-key"))
    }

    #[tokio::test]
    async fn test_match_books_posts_rpc_arguments() {
        let server = MockServer::start().await;
        let id = Uuid::now_v7();
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/match_books"))
            .and(header("apikey", "service-key"))
            .and(header("authorization", "Bearer service-key"))
            .and(body_json(json!({
                "query_embedding": [0.5, 0.25],
                "match_threshold": 0.7,
                "match_count": 10
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": id, "title": "The Dispossessed", "summary": null, "cover": null,
                 "author_id": null, "similarity": 0.91}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let matches = store(&server)
            .match_books(vec![0.5, 0.25], 0.7, 10)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, id);
        assert_eq!(matches[0].title, "The Dispossessed");
    }

    #[tokio::test]
    async fn test_recommend_books_is_keyed_by_user() {
        let server = MockServer::start().await;
        let user_id = Uuid::now_v7();
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/recommend_books"))
            .and(body_json(json!({
                "user_id": user_id,
                "similarity_threshold": 0.5,
                "top_n": 3
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let matches = store(&server).recommend_books(user_id, 0.5, 3).await.unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_keeps_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string("function match_books does not exist"),
            )
            .mount(&server)
            .await;

        let err = store(&server).match_books(vec![1.0], 0.7, 10).await.unwrap_err();
        match err {
            SearchError::Gateway(msg) => {
                assert!(msg.contains("400"));
                assert!(msg.contains("function match_books does not exist"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_undecodable_body_is_gateway_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": []})))
            .mount(&server)
            .await;

        let err = store(&server).match_books(vec![1.0], 0.7, 10).await.unwrap_err();
        assert!(matches!(err, SearchError::Gateway(_)));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_gateway_error() {
        let store = RpcVectorStore::new(VectorStoreConfig::new("http://127.0.0.1:9", "key"));
        let err = store.match_books(vec![1.0], 0.7, 10).await.unwrap_err();
        assert!(matches!(err, SearchError::Gateway(_)));
    }
}
