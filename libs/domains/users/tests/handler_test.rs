//! HTTP tests for the account router, wired to in-memory stores and a real
//! interactions service for profile libraries.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    middleware,
};
use axum_helpers::{JwtAuth, JwtConfig, TokenSubject, TokenType, authenticate};
use domain_catalog::{CatalogService, InMemoryCatalogRepository};
use domain_interactions::{InMemoryInteractionRepository, InteractionService, RepositoryEngagement};
use domain_users::{
    AccountService, AccountsConfig, InMemoryMailer, InMemoryUserRepository, LoginResponse,
    MessageResponse, UserProfile, UserResponse, handlers, mailer::link_parts,
};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use test_utils::TestDataBuilder;
use tower::ServiceExt;

const PASSWORD: &str = "lantern-orchard-47";

struct TestApp {
    router: Router,
    auth: JwtAuth,
    mailer: InMemoryMailer,
}

impl TestApp {
    fn new() -> Self {
        let config = JwtConfig::new("users-handler-tests-secret-0123456789").unwrap();
        let auth = JwtAuth::in_memory(&config);
        let mailer = InMemoryMailer::new();

        let interactions = InMemoryInteractionRepository::new();
        let catalog = Arc::new(
            CatalogService::new(InMemoryCatalogRepository::new())
                .with_engagement_source(Arc::new(RepositoryEngagement::new(interactions.clone()))),
        );
        let activity = Arc::new(InteractionService::new(interactions, catalog));

        let service = AccountService::new(
            InMemoryUserRepository::new(),
            auth.clone(),
            AccountsConfig::default(),
        )
        .with_mailer(Arc::new(mailer.clone()))
        .with_activity(activity);

        let router = handlers::router(Arc::new(service))
            .layer(middleware::from_fn_with_state(auth.clone(), authenticate));

        Self {
            router,
            auth,
            mailer,
        }
    }

    async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        self.router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap()
    }

    /// Sign up and follow the emailed verification link
    async fn verified_user(&self, username: &str, email: &str) -> LoginResponse {
        let response = self
            .call(
                "POST",
                "/auth/signup",
                None,
                Some(json!({ "username": username, "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let mail = self.mailer.last_to(email).await.unwrap();
        let (uid, token) = link_parts(&mail.text).unwrap();
        let response = self
            .call("GET", &format!("/auth/verify-email/{}/{}", uid, token), None, None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        self.login(email, PASSWORD).await
    }

    async fn login(&self, email: &str, password: &str) -> LoginResponse {
        let response = self
            .call(
                "POST",
                "/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response.into_body()).await
    }

    async fn admin_token(&self, test_name: &str) -> String {
        let builder = TestDataBuilder::from_test_name(test_name);
        let subject = TokenSubject {
            user_id: builder.user_id().to_string(),
            email: builder.email("admin"),
            name: builder.name("admin", "main"),
            roles: vec!["user".to_string(), "admin".to_string()],
        };
        self.auth
            .issue_token(&subject, TokenType::Access)
            .await
            .unwrap()
    }
}

async fn json_body<T: DeserializeOwned>(body: Body) -> T {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_signup_verify_login_me() {
    let app = TestApp::new();
    let email = TestDataBuilder::from_test_name("signup_flow").email("main");

    let response = app
        .call(
            "POST",
            "/auth/signup",
            None,
            Some(json!({ "username": "clarice", "email": email, "password": PASSWORD })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: MessageResponse = json_body(response.into_body()).await;
    assert_eq!(
        body.message,
        "User created. Please check your email to activate your account."
    );

    let mail = app.mailer.last_to(&email).await.unwrap();
    let (uid, token) = link_parts(&mail.text).unwrap();
    let response = app
        .call("GET", &format!("/auth/verify-email/{}/{}", uid, token), None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["message"], "Email verified successfully");
    assert!(body["tokens"]["access"].is_string());
    assert!(body["tokens"]["refresh"].is_string());

    let response = app
        .call(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": email, "password": PASSWORD })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookies: Vec<_> = response.headers().get_all(header::SET_COOKIE).iter().collect();
    assert_eq!(cookies.len(), 2);
    assert!(cookies[0].to_str().unwrap().contains("HttpOnly"));
    let session: LoginResponse = json_body(response.into_body()).await;
    assert_eq!(session.username, "clarice");

    let response = app.call("GET", "/auth/me", Some(&session.access), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let me: UserResponse = json_body(response.into_body()).await;
    assert_eq!(me.email, email);
    assert!(me.is_active);
}

#[tokio::test]
async fn test_signup_missing_fields() {
    let app = TestApp::new();

    let response = app
        .call("POST", "/auth/signup", None, Some(json!({ "username": "clarice" })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["message"], "All fields are required");
}

#[tokio::test]
async fn test_signup_weak_password_lists_problems() {
    let app = TestApp::new();

    let response = app
        .call(
            "POST",
            "/auth/signup",
            None,
            Some(json!({ "username": "clarice", "email": "c@example.com", "password": "1234" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = json_body(response.into_body()).await;
    let problems = body["details"].as_array().unwrap();
    assert_eq!(problems.len(), 2);
}

#[tokio::test]
async fn test_signup_duplicate_email() {
    let app = TestApp::new();
    app.verified_user("clarice", "clarice@example.com").await;

    let response = app
        .call(
            "POST",
            "/auth/signup",
            None,
            Some(json!({ "username": "other", "email": "CLARICE@example.com", "password": PASSWORD })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["message"], "Email already exists");
}

#[tokio::test]
async fn test_verify_email_invalid_link() {
    let app = TestApp::new();

    let response = app
        .call("GET", "/auth/verify-email/not-a-uid/1-00", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["message"], "Invalid verification link");
}

#[tokio::test]
async fn test_login_lockout_returns_429() {
    let app = TestApp::new();
    app.verified_user("clarice", "clarice@example.com").await;

    for _ in 0..5 {
        let response = app
            .call(
                "POST",
                "/auth/login",
                None,
                Some(json!({ "email": "clarice@example.com", "password": "wrong-password" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = json_body(response.into_body()).await;
        assert_eq!(body["message"], "Invalid credentials");
    }

    let response = app
        .call(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "clarice@example.com", "password": PASSWORD })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["message"], "Too many failed login attempts");
    assert_eq!(body["details"]["wait_time"], "15 minutes");
}

#[tokio::test]
async fn test_login_unverified_account() {
    let app = TestApp::new();
    app.call(
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "username": "clarice", "email": "clarice@example.com", "password": PASSWORD })),
    )
    .await;

    let response = app
        .call(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "clarice@example.com", "password": PASSWORD })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["message"], "Please verify your email first");
}

#[tokio::test]
async fn test_refresh_and_logout() {
    let app = TestApp::new();
    let session = app.verified_user("clarice", "clarice@example.com").await;

    let response = app
        .call(
            "POST",
            "/auth/token/refresh",
            None,
            Some(json!({ "refresh": session.refresh })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = json_body(response.into_body()).await;
    assert!(body["access"].is_string());

    let response = app
        .call(
            "POST",
            "/auth/logout",
            Some(&session.access),
            Some(json!({ "refresh": session.refresh })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.call("GET", "/auth/me", Some(&session.access), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .call(
            "POST",
            "/auth/token/refresh",
            None,
            Some(json!({ "refresh": session.refresh })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_password_reset_over_http() {
    let app = TestApp::new();
    app.verified_user("clarice", "clarice@example.com").await;

    let response = app
        .call(
            "POST",
            "/auth/password-reset",
            None,
            Some(json!({ "email": "clarice@example.com" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let mail = app.mailer.last_to("clarice@example.com").await.unwrap();
    assert!(mail.text.contains("/reset-password/"));
    let (uid, token) = link_parts(&mail.text).unwrap();

    let response = app
        .call(
            "POST",
            &format!("/auth/password-reset/{}/{}", uid, token),
            None,
            Some(json!({ "new_password": "quiet-meadow-1962" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: MessageResponse = json_body(response.into_body()).await;
    assert_eq!(
        body.message,
        "Password reset successful. You can now login with your new password."
    );

    app.login("clarice@example.com", "quiet-meadow-1962").await;
}

#[tokio::test]
async fn test_password_reset_unknown_email() {
    let app = TestApp::new();

    let response = app
        .call(
            "POST",
            "/auth/password-reset",
            None,
            Some(json!({ "email": "ghost@example.com" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["message"], "No user found with this email");
}

#[tokio::test]
async fn test_profile_includes_library() {
    let app = TestApp::new();
    let session = app.verified_user("clarice", "clarice@example.com").await;

    let response = app.call("GET", "/auth/me", Some(&session.access), None).await;
    let me: UserResponse = json_body(response.into_body()).await;

    let response = app.call("GET", &format!("/users/{}", me.id), None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .call("GET", &format!("/users/{}", me.id), Some(&session.access), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = json_body::<Value>(response.into_body()).await;
    for key in ["favorites", "read_list", "comments", "ratings"] {
        assert!(body[key].is_array(), "missing {key}");
    }
    let profile: UserProfile = serde_json::from_value(body).unwrap();
    assert_eq!(profile.username, "clarice");
}

#[tokio::test]
async fn test_change_password_and_delete_account() {
    let app = TestApp::new();
    let session = app.verified_user("clarice", "clarice@example.com").await;

    let response = app
        .call(
            "PUT",
            "/users/me/password",
            Some(&session.access),
            Some(json!({ "current_password": PASSWORD, "new_password": "quiet-meadow-1962" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .call("DELETE", "/users/me", Some(&session.access), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .call(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "clarice@example.com", "password": "quiet-meadow-1962" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_user_management() {
    let app = TestApp::new();
    let session = app.verified_user("clarice", "clarice@example.com").await;
    let admin = app.admin_token("admin_user_management").await;

    let response = app
        .call("GET", "/admin/users", Some(&session.access), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .call("GET", "/admin/users?search=CLARICE&is_active=true", Some(&admin), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let users: Vec<UserResponse> = json_body(response.into_body()).await;
    assert_eq!(users.len(), 1);
    let id = users[0].id;

    let response = app
        .call(
            "PUT",
            &format!("/admin/users/{}", id),
            Some(&admin),
            Some(json!({ "is_active": false })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: UserResponse = json_body(response.into_body()).await;
    assert!(!updated.is_active);

    let response = app
        .call(
            "PUT",
            &format!("/admin/users/{}", id),
            Some(&admin),
            Some(json!({ "email": "not-an-email" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .call("DELETE", &format!("/admin/users/{}", id), Some(&admin), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .call("GET", &format!("/admin/users/{}", id), Some(&admin), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
