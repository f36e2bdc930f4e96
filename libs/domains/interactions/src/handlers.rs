use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
};
use axum_helpers::{
    AdminUser, AuditEvent, AuditOutcome, AuthUser, UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, ForbiddenResponse,
        InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
    },
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::InteractionResult;
use crate::models::{
    Comment, CommentFilter, CommentInput, CommentSummary, ListKind, Pagination, RateBook, Rating,
    RatingSummary, ToggleResponse, UserLibrary,
};
use crate::repository::InteractionRepository;
use crate::service::{InteractionService, UserActivity};

#[derive(OpenApi)]
#[openapi(
    paths(
        toggle_favorite,
        toggle_read_list,
        rate_book,
        delete_rating,
        list_book_comments,
        add_comment,
        update_comment,
        delete_comment,
        my_library,
        admin_list_comments,
        admin_get_comment,
        admin_update_comment,
        admin_delete_comment,
    ),
    components(
        schemas(
            ToggleResponse, Rating, RateBook, Comment, CommentInput, CommentFilter, Pagination,
            CommentSummary, RatingSummary, UserLibrary
        ),
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
        (name = "interactions", description = "Favorites, read list, ratings and comments"),
        (name = "interactions-admin", description = "Comment moderation")
    )
)]
pub struct ApiDoc;

type SharedService<R> = Arc<InteractionService<R>>;

pub fn router<R: InteractionRepository + 'static>(service: SharedService<R>) -> Router {
    Router::new()
        .route("/books/{id}/favorite", post(toggle_favorite))
        .route("/books/{id}/read-list", post(toggle_read_list))
        .route("/books/{id}/rating", put(rate_book).delete(delete_rating))
        .route(
            "/books/{id}/comments",
            get(list_book_comments).post(add_comment),
        )
        .route("/comments/{id}", put(update_comment).delete(delete_comment))
        .route("/me/library", get(my_library))
        .route("/admin/user-comments", get(admin_list_comments))
        .route(
            "/admin/user-comments/{id}",
            get(admin_get_comment)
                .put(admin_update_comment)
                .delete(admin_delete_comment),
        )
        .with_state(service)
}

/// Add the book to the caller's favorites, or remove it
#[utoipa::path(
    post,
    path = "/books/{id}/favorite",
    tag = "interactions",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Favorite toggled", body = ToggleResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn toggle_favorite<R: InteractionRepository>(
    State(service): State<SharedService<R>>,
    user: AuthUser,
    UuidPath(book_id): UuidPath,
) -> InteractionResult<Json<ToggleResponse>> {
    Ok(Json(
        service.toggle(ListKind::Favorites, user.id, book_id).await?,
    ))
}

/// Add the book to the caller's read list, or remove it
#[utoipa::path(
    post,
    path = "/books/{id}/read-list",
    tag = "interactions",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Read list toggled", body = ToggleResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn toggle_read_list<R: InteractionRepository>(
    State(service): State<SharedService<R>>,
    user: AuthUser,
    UuidPath(book_id): UuidPath,
) -> InteractionResult<Json<ToggleResponse>> {
    Ok(Json(
        service.toggle(ListKind::ReadList, user.id, book_id).await?,
    ))
}

/// Rate a book from 0 to 5, replacing any earlier rating by the caller
#[utoipa::path(
    put,
    path = "/books/{id}/rating",
    tag = "interactions",
    params(("id" = Uuid, Path, description = "Book ID")),
    request_body = RateBook,
    responses(
        (status = 200, description = "Rating stored", body = Rating),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn rate_book<R: InteractionRepository>(
    State(service): State<SharedService<R>>,
    user: AuthUser,
    UuidPath(book_id): UuidPath,
    ValidatedJson(input): ValidatedJson<RateBook>,
) -> InteractionResult<Json<Rating>> {
    Ok(Json(service.rate_book(user.id, book_id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/books/{id}/rating",
    tag = "interactions",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Rating removed"),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn delete_rating<R: InteractionRepository>(
    State(service): State<SharedService<R>>,
    user: AuthUser,
    UuidPath(book_id): UuidPath,
) -> InteractionResult<StatusCode> {
    service.delete_rating(user.id, book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Comments on a book, newest first
#[utoipa::path(
    get,
    path = "/books/{id}/comments",
    tag = "interactions",
    params(("id" = Uuid, Path, description = "Book ID"), Pagination),
    responses(
        (status = 200, description = "Comments", body = Vec<Comment>),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn list_book_comments<R: InteractionRepository>(
    State(service): State<SharedService<R>>,
    UuidPath(book_id): UuidPath,
    Query(page): Query<Pagination>,
) -> InteractionResult<Json<Vec<Comment>>> {
    Ok(Json(service.list_book_comments(book_id, page).await?))
}

#[utoipa::path(
    post,
    path = "/books/{id}/comments",
    tag = "interactions",
    params(("id" = Uuid, Path, description = "Book ID")),
    request_body = CommentInput,
    responses(
        (status = 201, description = "Comment created", body = Comment),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn add_comment<R: InteractionRepository>(
    State(service): State<SharedService<R>>,
    user: AuthUser,
    UuidPath(book_id): UuidPath,
    ValidatedJson(input): ValidatedJson<CommentInput>,
) -> InteractionResult<impl IntoResponse> {
    let comment = service
        .add_comment(user.id, &user.username, book_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[utoipa::path(
    put,
    path = "/comments/{id}",
    tag = "interactions",
    params(("id" = Uuid, Path, description = "Comment ID")),
    request_body = CommentInput,
    responses(
        (status = 200, description = "Comment updated", body = Comment),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn update_comment<R: InteractionRepository>(
    State(service): State<SharedService<R>>,
    user: AuthUser,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<CommentInput>,
) -> InteractionResult<Json<Comment>> {
    Ok(Json(service.update_comment(user.id, id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/comments/{id}",
    tag = "interactions",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn delete_comment<R: InteractionRepository>(
    State(service): State<SharedService<R>>,
    user: AuthUser,
    UuidPath(id): UuidPath,
) -> InteractionResult<StatusCode> {
    service.delete_comment(user.id, user.is_admin(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's favorites, read list, comments and ratings
#[utoipa::path(
    get,
    path = "/me/library",
    tag = "interactions",
    responses(
        (status = 200, description = "Caller's library", body = UserLibrary),
        (status = 401, response = UnauthorizedResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn my_library<R: InteractionRepository + 'static>(
    State(service): State<SharedService<R>>,
    user: AuthUser,
) -> InteractionResult<Json<UserLibrary>> {
    Ok(Json(service.library(user.id).await?))
}

// Admin

#[utoipa::path(
    get,
    path = "/admin/user-comments",
    tag = "interactions-admin",
    params(CommentFilter),
    responses(
        (status = 200, description = "Comments, newest first", body = Vec<Comment>),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_list_comments<R: InteractionRepository>(
    State(service): State<SharedService<R>>,
    _admin: AdminUser,
    Query(filter): Query<CommentFilter>,
) -> InteractionResult<Json<Vec<Comment>>> {
    Ok(Json(service.list_comments(filter).await?))
}

#[utoipa::path(
    get,
    path = "/admin/user-comments/{id}",
    tag = "interactions-admin",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Comment found", body = Comment),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_get_comment<R: InteractionRepository>(
    State(service): State<SharedService<R>>,
    _admin: AdminUser,
    UuidPath(id): UuidPath,
) -> InteractionResult<Json<Comment>> {
    Ok(Json(service.get_comment(id).await?))
}

#[utoipa::path(
    put,
    path = "/admin/user-comments/{id}",
    tag = "interactions-admin",
    params(("id" = Uuid, Path, description = "Comment ID")),
    request_body = CommentInput,
    responses(
        (status = 200, description = "Comment updated", body = Comment),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_update_comment<R: InteractionRepository>(
    State(service): State<SharedService<R>>,
    admin: AdminUser,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<CommentInput>,
) -> InteractionResult<Json<Comment>> {
    let comment = service.moderate_comment(id, input).await?;

    AuditEvent::new(
        Some(admin.0.id.to_string()),
        "comment.moderate",
        Some(format!("comment:{}", id)),
        AuditOutcome::Success,
    )
    .with_request(&headers)
    .log();

    Ok(Json(comment))
}

#[utoipa::path(
    delete,
    path = "/admin/user-comments/{id}",
    tag = "interactions-admin",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_delete_comment<R: InteractionRepository>(
    State(service): State<SharedService<R>>,
    admin: AdminUser,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> InteractionResult<StatusCode> {
    service.remove_comment(id).await?;

    AuditEvent::new(
        Some(admin.0.id.to_string()),
        "comment.delete",
        Some(format!("comment:{}", id)),
        AuditOutcome::Success,
    )
    .with_request(&headers)
    .log();

    Ok(StatusCode::NO_CONTENT)
}
