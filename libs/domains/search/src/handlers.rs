use axum::{Json, Router, extract::State, http::HeaderMap, routing::post};
use axum_helpers::{
    AdminUser, AuditEvent, AuditOutcome, AuthUser, UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, ForbiddenResponse,
        InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
    },
};
use serde_json::json;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::SearchResult;
use crate::models::{BookMatch, IndexResponse, RecommendationRequest, SemanticSearchRequest};
use crate::service::SearchService;

#[derive(OpenApi)]
#[openapi(
    paths(semantic_search, recommendations, index_book),
    components(
        schemas(SemanticSearchRequest, RecommendationRequest, BookMatch, IndexResponse),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "search", description = "Semantic search and recommendations")
    )
)]
pub struct ApiDoc;

type SharedService = Arc<SearchService>;

pub fn router(service: SharedService) -> Router {
    Router::new()
        .route("/search/semantic", post(semantic_search))
        .route("/search/recommendations", post(recommendations))
        .route("/admin/books/{id}/embedding", post(index_book))
        .with_state(service)
}

/// Books whose meaning is closest to a free-text query
#[utoipa::path(
    post,
    path = "/search/semantic",
    tag = "search",
    request_body = SemanticSearchRequest,
    responses(
        (status = 200, description = "Matches ordered by the vector store", body = Vec<BookMatch>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn semantic_search(
    State(service): State<SharedService>,
    ValidatedJson(request): ValidatedJson<SemanticSearchRequest>,
) -> SearchResult<Json<Vec<BookMatch>>> {
    Ok(Json(service.semantic_search(request).await?))
}

/// Recommendations for the caller
#[utoipa::path(
    post,
    path = "/search/recommendations",
    tag = "search",
    request_body = RecommendationRequest,
    responses(
        (status = 200, description = "Recommended books", body = Vec<BookMatch>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn recommendations(
    State(service): State<SharedService>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<RecommendationRequest>,
) -> SearchResult<Json<Vec<BookMatch>>> {
    Ok(Json(service.recommend(user.id, request).await?))
}

/// Recompute and store a book's embedding
#[utoipa::path(
    post,
    path = "/admin/books/{id}/embedding",
    tag = "search",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Embedding stored", body = IndexResponse),
        (status = 400, response = BadRequestUuidResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn index_book(
    State(service): State<SharedService>,
    admin: AdminUser,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> SearchResult<Json<IndexResponse>> {
    let response = service.index_book(id).await?;

    AuditEvent::new(
        Some(admin.0.id.to_string()),
        "book.embedding",
        Some(format!("book:{}", id)),
        AuditOutcome::Success,
    )
    .with_request(&headers)
    .with_details(json!({ "provider": response.provider, "dimension": response.dimension }))
    .log();

    Ok(Json(response))
}
