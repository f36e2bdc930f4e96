//! HTTP tests for the catalog router against the in-memory repository.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    middleware,
};
use axum_helpers::{JwtAuth, JwtConfig, TokenSubject, TokenType, authenticate};
use domain_catalog::{
    Author, Book, BookSummary, CatalogService, Category, InMemoryCatalogRepository, handlers,
};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use test_utils::TestDataBuilder;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    auth: JwtAuth,
}

impl TestApp {
    fn new() -> Self {
        let config = JwtConfig::new("catalog-handler-tests-secret-0123456789").unwrap();
        let auth = JwtAuth::in_memory(&config);
        let service = Arc::new(CatalogService::new(InMemoryCatalogRepository::new()));
        let router = handlers::router(service)
            .layer(middleware::from_fn_with_state(auth.clone(), authenticate));
        Self { router, auth }
    }

    async fn token(&self, test_name: &str, roles: &[&str]) -> String {
        let builder = TestDataBuilder::from_test_name(test_name);
        let subject = TokenSubject {
            user_id: builder.user_id().to_string(),
            email: format!("{}@example.com", builder.name("user", "main")),
            name: builder.name("user", "main"),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        };
        self.auth
            .issue_token(&subject, TokenType::Access)
            .await
            .unwrap()
    }

    async fn admin_token(&self) -> String {
        self.token("catalog_admin", &["user", "admin"]).await
    }

    async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn post_json(&self, uri: &str, token: &str, body: Value) -> axum::response::Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn get(&self, uri: &str) -> axum::response::Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    /// Seed an author, a category and one book through the admin API
    async fn seed(&self) -> (Author, Category, Book) {
        let token = self.admin_token().await;

        let response = self
            .post_json("/admin/authors", &token, json!({ "name": "Ursula K. Le Guin" }))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let author: Author = json_body(response.into_body()).await;

        let response = self
            .post_json("/admin/categories", &token, json!({ "name": "Fantasy" }))
            .await;
        let category: Category = json_body(response.into_body()).await;

        let response = self
            .post_json(
                "/admin/books",
                &token,
                json!({
                    "title": "A Wizard of Earthsea",
                    "summary": "A young mage learns the cost of power",
                    "page_count": 183,
                    "author_id": author.id,
                    "category_id": category.id,
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let book: Book = json_body(response.into_body()).await;

        (author, category, book)
    }
}

async fn json_body<T: DeserializeOwned>(body: Body) -> T {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_public_book_listing_and_detail() {
    let app = TestApp::new();
    let (_, _, book) = app.seed().await;

    let response = app.get("/books?title=earthsea").await;
    assert_eq!(response.status(), StatusCode::OK);
    let books: Vec<Book> = json_body(response.into_body()).await;
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].id, book.id);

    let response = app.get(&format!("/books/{}", book.id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["title"], "A Wizard of Earthsea");
    assert!(body.get("embedding").is_none());
}

#[tokio::test]
async fn test_unknown_book_returns_404() {
    let app = TestApp::new();

    let response = app.get(&format!("/books/{}", uuid::Uuid::now_v7())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["error"], "NOT_FOUND");
    assert_eq!(body["message"], "Book not found");
}

#[tokio::test]
async fn test_invalid_book_id_returns_400() {
    let app = TestApp::new();

    let response = app.get("/books/not-a-uuid").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_author_detail_lists_books_and_counters() {
    let app = TestApp::new();
    let (author, category, book) = app.seed().await;

    let response = app.get(&format!("/authors/{}", author.id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let detail: Value = json_body(response.into_body()).await;
    assert_eq!(detail["name"], "Ursula K. Le Guin");
    assert_eq!(detail["book_count"], 1);
    assert_eq!(detail["books"][0]["id"], book.id.to_string());
    assert_eq!(detail["books"][0]["page_count"], 183);

    let response = app.get("/categories?search=fant").await;
    let categories: Vec<Category> = json_body(response.into_body()).await;
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].id, category.id);
    assert_eq!(categories[0].book_count, 1);
}

#[tokio::test]
async fn test_admin_routes_require_authentication() {
    let app = TestApp::new();

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/admin/authors")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "name": "Anonymous" }).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_reject_regular_users() {
    let app = TestApp::new();
    let token = app.token("catalog_reader", &["user"]).await;

    let response = app
        .post_json("/admin/authors", &token, json!({ "name": "Someone" }))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["error"], "FORBIDDEN");
}

#[tokio::test]
async fn test_create_book_with_unknown_author_is_rejected() {
    let app = TestApp::new();
    let (_, category, _) = app.seed().await;
    let token = app.admin_token().await;

    let response = app
        .post_json(
            "/admin/books",
            &token,
            json!({
                "title": "Orphan",
                "author_id": uuid::Uuid::now_v7(),
                "category_id": category.id,
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_book_validates_title() {
    let app = TestApp::new();
    let (author, category, _) = app.seed().await;
    let token = app.admin_token().await;

    let response = app
        .post_json(
            "/admin/books",
            &token,
            json!({
                "title": "",
                "author_id": author.id,
                "category_id": category.id,
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = json_body(response.into_body()).await;
    assert!(body["details"]["title"].is_array());
}

#[tokio::test]
async fn test_delete_author_cascades_to_books() {
    let app = TestApp::new();
    let (author, category, book) = app.seed().await;
    let token = app.admin_token().await;

    let response = app
        .send(
            Request::builder()
                .method("DELETE")
                .uri(format!("/admin/authors/{}", author.id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.get(&format!("/books/{}", book.id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get("/categories").await;
    let categories: Vec<Category> = json_body(response.into_body()).await;
    let fantasy = categories.iter().find(|c| c.id == category.id).unwrap();
    assert_eq!(fantasy.book_count, 0);
}

#[tokio::test]
async fn test_update_book_changes_fields() {
    let app = TestApp::new();
    let (_, _, book) = app.seed().await;
    let token = app.admin_token().await;

    let response = app
        .send(
            Request::builder()
                .method("PUT")
                .uri(format!("/admin/books/{}", book.id))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::from(json!({ "page_count": 205 }).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Book = json_body(response.into_body()).await;
    assert_eq!(updated.page_count, 205);
    assert_eq!(updated.title, book.title);
}

#[tokio::test]
async fn test_refresh_stats_reports_counts() {
    let app = TestApp::new();
    app.seed().await;
    let token = app.admin_token().await;

    let response = app.post_json("/admin/stats/refresh", &token, json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["authors"], 1);
    assert_eq!(body["categories"], 1);
}

#[tokio::test]
async fn test_author_detail_books_are_summaries() {
    let app = TestApp::new();
    let (author, _, _) = app.seed().await;

    let response = app.get(&format!("/authors/{}", author.id)).await;
    let body: Value = json_body(response.into_body()).await;
    let books: Vec<BookSummary> = serde_json::from_value(body["books"].clone()).unwrap();
    assert_eq!(books.len(), 1);
    assert!(body["books"][0].get("summary").is_none());
}
