//! HTTP tests for the search router against mocked encoder and vector store servers.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    middleware,
};
use axum_helpers::{JwtAuth, JwtConfig, TokenSubject, TokenType, authenticate};
use domain_catalog::{
    AuthorInput, Book, CatalogService, CategoryInput, CreateBook, InMemoryCatalogRepository,
};
use domain_search::{
    BookMatch, IndexResponse, RpcVectorStore, SearchService, SentenceTransformerConfig,
    SentenceTransformerProvider, VectorStoreConfig, handlers,
};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use test_utils::TestDataBuilder;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENCODER_PATH: &str = "/pipeline/feature-extraction/sentence-transformers/all-MiniLM-L6-v2";

struct TestApp {
    router: Router,
    auth: JwtAuth,
    encoder: MockServer,
    store: MockServer,
    catalog: Arc<CatalogService<InMemoryCatalogRepository>>,
    book: Book,
}

impl TestApp {
    async fn new() -> Self {
        let config = JwtConfig::new("search-handler-tests-secret-0123456789").unwrap();
        let auth = JwtAuth::in_memory(&config);

        let encoder = MockServer::start().await;
        let store = MockServer::start().await;

        let catalog = Arc::new(CatalogService::new(InMemoryCatalogRepository::new()));
        let author = catalog
            .create_author(AuthorInput {
                name: "Ursula K. Le Guin".to_string(),
            })
            .await
            .unwrap();
        let category = catalog
            .create_category(CategoryInput {
                name: "Science Fiction".to_string(),
            })
            .await
            .unwrap();
        let book = catalog
            .create_book(CreateBook {
                title: "The Left Hand of Darkness".to_string(),
                summary: "An envoy on the winter planet Gethen".to_string(),
                page_count: 304,
                author_id: author.id,
                category_id: category.id,
                cover: None,
                pdf_link: None,
            })
            .await
            .unwrap();

        let embedder = SentenceTransformerProvider::new(SentenceTransformerConfig {
            normalize: false,
            ..SentenceTransformerConfig::default().with_base_url(encoder.uri())
        });
        let vector_store = RpcVectorStore::new(VectorStoreConfig::new(store.uri(), "service-key"));
        let service = Arc::new(SearchService::new(
            Arc::new(embedder),
            Arc::new(vector_store),
            catalog.clone(),
        ));

        let router =
            handlers::router(service).layer(middleware::from_fn_with_state(auth.clone(), authenticate));

        Self {
            router,
            auth,
            encoder,
            store,
            catalog,
            book,
        }
    }

    async fn token(&self, test_name: &str, roles: &[&str]) -> (Uuid, String) {
        let builder = TestDataBuilder::from_test_name(test_name);
        let subject = TokenSubject {
            user_id: builder.user_id().to_string(),
            email: format!("{}@example.com", builder.name("user", "main")),
            name: builder.name("user", "main"),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        };
        let token = self
            .auth
            .issue_token(&subject, TokenType::Access)
            .await
            .unwrap();
        (builder.user_id(), token)
    }

    async fn mock_encoder(&self, states: Value) {
        Mock::given(method("POST"))
            .and(path(ENCODER_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(states))
            .mount(&self.encoder)
            .await;
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> axum::response::Response {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.router
            .clone()
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }
}

async fn json_body<T: DeserializeOwned>(body: Body) -> T {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn match_row(book: &Book, similarity: f32) -> Value {
    json!({
        "id": book.id,
        "title": book.title,
        "summary": book.summary,
        "cover": null,
        "author_id": book.author_id,
        "similarity": similarity
    })
}

#[tokio::test]
async fn test_semantic_search_returns_matches() {
    let app = TestApp::new().await;
    app.mock_encoder(json!([[0.0, 1.0], [1.0, 0.0]])).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/match_books"))
        .and(body_json(json!({
            "query_embedding": [0.5, 0.5],
            "match_threshold": 0.7,
            "match_count": 10
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([match_row(&app.book, 0.83)])))
        .expect(1)
        .mount(&app.store)
        .await;

    let response = app
        .post("/search/semantic", None, json!({"key": "gender and politics on a cold planet"}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let matches: Vec<BookMatch> = json_body(response.into_body()).await;
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, app.book.id);
    assert_eq!(matches[0].author_id, Some(app.book.author_id));
}

#[tokio::test]
async fn test_semantic_search_passes_threshold_and_count() {
    let app = TestApp::new().await;
    app.mock_encoder(json!([0.1, 0.2])).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/match_books"))
        .and(body_partial_json(json!({"match_threshold": 0.5, "match_count": 3})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([match_row(&app.book, 0.6)])))
        .expect(1)
        .mount(&app.store)
        .await;

    let response = app
        .post(
            "/search/semantic",
            None,
            json!({"key": "winter", "match_threshold": 0.5, "match_count": 3}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_semantic_search_without_matches_is_not_found() {
    let app = TestApp::new().await;
    app.mock_encoder(json!([0.1, 0.2])).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/match_books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&app.store)
        .await;

    let response = app
        .post("/search/semantic", None, json!({"key": "cookbook for volcanoes"}))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["message"], "No matching books found");
}

#[tokio::test]
async fn test_store_failure_is_internal_error_with_message() {
    let app = TestApp::new().await;
    app.mock_encoder(json!([0.1, 0.2])).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/match_books"))
        .respond_with(ResponseTemplate::new(500).set_body_string("statement timeout"))
        .mount(&app.store)
        .await;

    let response = app.post("/search/semantic", None, json!({"key": "winter"})).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = json_body(response.into_body()).await;
    assert!(body["message"].as_str().unwrap().contains("statement timeout"));
}

#[tokio::test]
async fn test_encoder_failure_is_internal_error() {
    let app = TestApp::new().await;
    Mock::given(method("POST"))
        .and(path(ENCODER_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("model is currently loading"))
        .mount(&app.encoder)
        .await;

    let response = app.post("/search/semantic", None, json!({"key": "winter"})).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = json_body(response.into_body()).await;
    assert!(body["message"].as_str().unwrap().contains("model is currently loading"));
}

#[tokio::test]
async fn test_semantic_search_validation() {
    let app = TestApp::new().await;

    for body in [
        json!({"key": "  "}),
        json!({}),
        json!({"key": "winter", "match_threshold": 1.2}),
        json!({"key": "winter", "match_count": 0}),
        json!({"key": "winter", "match_count": 101}),
    ] {
        let response = app.post("/search/semantic", None, body.clone()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
    }
}

#[tokio::test]
async fn test_recommendations_require_login() {
    let app = TestApp::new().await;
    let response = app.post("/search/recommendations", None, json!({})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_recommendations_for_caller() {
    let app = TestApp::new().await;
    let (user_id, token) = app.token("recommendations_for_caller", &["user"]).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/recommend_books"))
        .and(body_json(json!({
            "user_id": user_id,
            "similarity_threshold": 0.7,
            "top_n": 5
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([match_row(&app.book, 0.74)])))
        .expect(1)
        .mount(&app.store)
        .await;

    let response = app
        .post("/search/recommendations", Some(&token), json!({"top_n": 5}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let matches: Vec<BookMatch> = json_body(response.into_body()).await;
    assert_eq!(matches[0].title, "The Left Hand of Darkness");
}

#[tokio::test]
async fn test_recommendations_empty_is_not_found() {
    let app = TestApp::new().await;
    let (_, token) = app.token("recommendations_empty", &["user"]).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/recommend_books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&app.store)
        .await;

    let response = app.post("/search/recommendations", Some(&token), json!({})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_index_book_requires_admin() {
    let app = TestApp::new().await;
    let uri = format!("/admin/books/{}/embedding", app.book.id);

    let response = app.post(&uri, None, json!({})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (_, reader) = app.token("index_book_reader", &["user"]).await;
    let response = app.post(&uri, Some(&reader), json!({})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_index_book_stores_embedding() {
    let app = TestApp::new().await;
    let (_, admin) = app.token("index_book_admin", &["user", "admin"]).await;
    Mock::given(method("POST"))
        .and(path(ENCODER_PATH))
        .and(body_partial_json(json!({
            "inputs": "The Left Hand of Darkness. An envoy on the winter planet Gethen"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([[0.2, 0.4, 0.6]])))
        .expect(1)
        .mount(&app.encoder)
        .await;

    let uri = format!("/admin/books/{}/embedding", app.book.id);
    let response = app.post(&uri, Some(&admin), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let indexed: IndexResponse = json_body(response.into_body()).await;
    assert_eq!(indexed.dimension, 3);

    let stored = app.catalog.get_book(app.book.id).await.unwrap();
    assert_eq!(stored.embedding, Some(vec![0.2, 0.4, 0.6]));

    let missing = format!("/admin/books/{}/embedding", Uuid::now_v7());
    let response = app.post(&missing, Some(&admin), json!({})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
