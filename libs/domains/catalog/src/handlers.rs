use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use axum_helpers::{
    AdminUser, AuditEvent, AuditOutcome, UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, ForbiddenResponse,
        InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
    },
};
use serde_json::json;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::CatalogResult;
use crate::models::{
    Author, AuthorDetail, AuthorInput, Book, BookFilter, BookSummary, Category, CategoryInput,
    CreateBook, NameFilter, RefreshSummary, UpdateBook,
};
use crate::repository::CatalogRepository;
use crate::service::CatalogService;

/// OpenAPI documentation for the catalog endpoints
#[derive(OpenApi)]
#[openapi(
    paths(
        list_books,
        get_book,
        list_authors,
        get_author,
        list_categories,
        admin_list_books,
        admin_create_book,
        admin_get_book,
        admin_update_book,
        admin_delete_book,
        admin_list_authors,
        admin_create_author,
        admin_get_author,
        admin_update_author,
        admin_delete_author,
        admin_list_categories,
        admin_create_category,
        admin_get_category,
        admin_update_category,
        admin_delete_category,
        refresh_stats,
    ),
    components(
        schemas(
            Book, BookSummary, Author, AuthorDetail, Category, CreateBook, UpdateBook,
            AuthorInput, CategoryInput, BookFilter, NameFilter, RefreshSummary
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
        (name = "catalog", description = "Public book, author and category listings"),
        (name = "catalog-admin", description = "Catalog management for administrators")
    )
)]
pub struct ApiDoc;

type SharedService<R> = Arc<CatalogService<R>>;

/// Catalog routes, public under `/books`, `/authors`, `/categories` and
/// admin-only under `/admin/...`.
pub fn router<R: CatalogRepository + 'static>(service: SharedService<R>) -> Router {
    Router::new()
        .route("/books", get(list_books))
        .route("/books/{id}", get(get_book))
        .route("/authors", get(list_authors))
        .route("/authors/{id}", get(get_author))
        .route("/categories", get(list_categories))
        .route(
            "/admin/books",
            get(admin_list_books).post(admin_create_book),
        )
        .route(
            "/admin/books/{id}",
            get(admin_get_book)
                .put(admin_update_book)
                .delete(admin_delete_book),
        )
        .route(
            "/admin/authors",
            get(admin_list_authors).post(admin_create_author),
        )
        .route(
            "/admin/authors/{id}",
            get(admin_get_author)
                .put(admin_update_author)
                .delete(admin_delete_author),
        )
        .route(
            "/admin/categories",
            get(admin_list_categories).post(admin_create_category),
        )
        .route(
            "/admin/categories/{id}",
            get(admin_get_category)
                .put(admin_update_category)
                .delete(admin_delete_category),
        )
        .route("/admin/stats/refresh", post(refresh_stats))
        .with_state(service)
}

fn audit(admin: &AdminUser, headers: &HeaderMap, action: &str, resource: String) -> AuditEvent {
    AuditEvent::new(
        Some(admin.0.id.to_string()),
        action,
        Some(resource),
        AuditOutcome::Success,
    )
    .with_request(headers)
}

// Public

/// List books, newest first
#[utoipa::path(
    get,
    path = "/books",
    tag = "catalog",
    params(BookFilter),
    responses(
        (status = 200, description = "List of books", body = Vec<Book>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_books<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    Query(filter): Query<BookFilter>,
) -> CatalogResult<Json<Vec<Book>>> {
    Ok(Json(service.list_books(filter).await?))
}

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "catalog",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book found", body = Book),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn get_book<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    UuidPath(id): UuidPath,
) -> CatalogResult<Json<Book>> {
    Ok(Json(service.get_book(id).await?))
}

/// List authors ordered by name
#[utoipa::path(
    get,
    path = "/authors",
    tag = "catalog",
    params(NameFilter),
    responses(
        (status = 200, description = "List of authors", body = Vec<Author>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_authors<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    Query(filter): Query<NameFilter>,
) -> CatalogResult<Json<Vec<Author>>> {
    Ok(Json(service.list_authors(filter).await?))
}

/// Get an author and the books they wrote
#[utoipa::path(
    get,
    path = "/authors/{id}",
    tag = "catalog",
    params(("id" = Uuid, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author found", body = AuthorDetail),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn get_author<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    UuidPath(id): UuidPath,
) -> CatalogResult<Json<AuthorDetail>> {
    Ok(Json(service.get_author_detail(id).await?))
}

/// List categories ordered by name
#[utoipa::path(
    get,
    path = "/categories",
    tag = "catalog",
    params(NameFilter),
    responses(
        (status = 200, description = "List of categories", body = Vec<Category>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_categories<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    Query(filter): Query<NameFilter>,
) -> CatalogResult<Json<Vec<Category>>> {
    Ok(Json(service.list_categories(filter).await?))
}

// Admin: books

#[utoipa::path(
    get,
    path = "/admin/books",
    tag = "catalog-admin",
    params(BookFilter),
    responses(
        (status = 200, description = "List of books", body = Vec<Book>),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_list_books<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    _admin: AdminUser,
    Query(filter): Query<BookFilter>,
) -> CatalogResult<Json<Vec<Book>>> {
    Ok(Json(service.list_books(filter).await?))
}

/// Create a book; author and category must exist
#[utoipa::path(
    post,
    path = "/admin/books",
    tag = "catalog-admin",
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_create_book<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    admin: AdminUser,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<CreateBook>,
) -> CatalogResult<impl IntoResponse> {
    let book = service.create_book(input).await?;

    audit(&admin, &headers, "book.create", format!("book:{}", book.id))
        .with_details(json!({ "title": book.title, "author_id": book.author_id }))
        .log();

    Ok((StatusCode::CREATED, Json(book)))
}

#[utoipa::path(
    get,
    path = "/admin/books/{id}",
    tag = "catalog-admin",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book found", body = Book),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_get_book<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    _admin: AdminUser,
    UuidPath(id): UuidPath,
) -> CatalogResult<Json<Book>> {
    Ok(Json(service.get_book(id).await?))
}

#[utoipa::path(
    put,
    path = "/admin/books/{id}",
    tag = "catalog-admin",
    params(("id" = Uuid, Path, description = "Book ID")),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_update_book<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    admin: AdminUser,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateBook>,
) -> CatalogResult<Json<Book>> {
    let book = service.update_book(id, input).await?;
    audit(&admin, &headers, "book.update", format!("book:{}", id)).log();
    Ok(Json(book))
}

#[utoipa::path(
    delete,
    path = "/admin/books/{id}",
    tag = "catalog-admin",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_delete_book<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    admin: AdminUser,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> CatalogResult<StatusCode> {
    service.delete_book(id).await?;
    audit(&admin, &headers, "book.delete", format!("book:{}", id)).log();
    Ok(StatusCode::NO_CONTENT)
}

// Admin: authors

#[utoipa::path(
    get,
    path = "/admin/authors",
    tag = "catalog-admin",
    params(NameFilter),
    responses(
        (status = 200, description = "List of authors", body = Vec<Author>),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_list_authors<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    _admin: AdminUser,
    Query(filter): Query<NameFilter>,
) -> CatalogResult<Json<Vec<Author>>> {
    Ok(Json(service.list_authors(filter).await?))
}

#[utoipa::path(
    post,
    path = "/admin/authors",
    tag = "catalog-admin",
    request_body = AuthorInput,
    responses(
        (status = 201, description = "Author created", body = Author),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_create_author<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    admin: AdminUser,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<AuthorInput>,
) -> CatalogResult<impl IntoResponse> {
    let author = service.create_author(input).await?;
    audit(&admin, &headers, "author.create", format!("author:{}", author.id)).log();
    Ok((StatusCode::CREATED, Json(author)))
}

#[utoipa::path(
    get,
    path = "/admin/authors/{id}",
    tag = "catalog-admin",
    params(("id" = Uuid, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author found", body = Author),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_get_author<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    _admin: AdminUser,
    UuidPath(id): UuidPath,
) -> CatalogResult<Json<Author>> {
    Ok(Json(service.get_author(id).await?))
}

#[utoipa::path(
    put,
    path = "/admin/authors/{id}",
    tag = "catalog-admin",
    params(("id" = Uuid, Path, description = "Author ID")),
    request_body = AuthorInput,
    responses(
        (status = 200, description = "Author renamed", body = Author),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_update_author<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    admin: AdminUser,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<AuthorInput>,
) -> CatalogResult<Json<Author>> {
    let author = service.rename_author(id, input).await?;
    audit(&admin, &headers, "author.update", format!("author:{}", id)).log();
    Ok(Json(author))
}

/// Delete an author together with their books
#[utoipa::path(
    delete,
    path = "/admin/authors/{id}",
    tag = "catalog-admin",
    params(("id" = Uuid, Path, description = "Author ID")),
    responses(
        (status = 204, description = "Author deleted"),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_delete_author<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    admin: AdminUser,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> CatalogResult<StatusCode> {
    service.delete_author(id).await?;
    audit(&admin, &headers, "author.delete", format!("author:{}", id)).log();
    Ok(StatusCode::NO_CONTENT)
}

// Admin: categories

#[utoipa::path(
    get,
    path = "/admin/categories",
    tag = "catalog-admin",
    params(NameFilter),
    responses(
        (status = 200, description = "List of categories", body = Vec<Category>),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_list_categories<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    _admin: AdminUser,
    Query(filter): Query<NameFilter>,
) -> CatalogResult<Json<Vec<Category>>> {
    Ok(Json(service.list_categories(filter).await?))
}

#[utoipa::path(
    post,
    path = "/admin/categories",
    tag = "catalog-admin",
    request_body = CategoryInput,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_create_category<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    admin: AdminUser,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<CategoryInput>,
) -> CatalogResult<impl IntoResponse> {
    let category = service.create_category(input).await?;
    audit(
        &admin,
        &headers,
        "category.create",
        format!("category:{}", category.id),
    )
    .log();
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    get,
    path = "/admin/categories/{id}",
    tag = "catalog-admin",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category found", body = Category),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_get_category<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    _admin: AdminUser,
    UuidPath(id): UuidPath,
) -> CatalogResult<Json<Category>> {
    Ok(Json(service.get_category(id).await?))
}

#[utoipa::path(
    put,
    path = "/admin/categories/{id}",
    tag = "catalog-admin",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = CategoryInput,
    responses(
        (status = 200, description = "Category renamed", body = Category),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_update_category<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    admin: AdminUser,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<CategoryInput>,
) -> CatalogResult<Json<Category>> {
    let category = service.rename_category(id, input).await?;
    audit(&admin, &headers, "category.update", format!("category:{}", id)).log();
    Ok(Json(category))
}

/// Delete a category together with its books
#[utoipa::path(
    delete,
    path = "/admin/categories/{id}",
    tag = "catalog-admin",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_delete_category<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    admin: AdminUser,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> CatalogResult<StatusCode> {
    service.delete_category(id).await?;
    audit(&admin, &headers, "category.delete", format!("category:{}", id)).log();
    Ok(StatusCode::NO_CONTENT)
}

/// Recompute every author and category aggregate
#[utoipa::path(
    post,
    path = "/admin/stats/refresh",
    tag = "catalog-admin",
    responses(
        (status = 200, description = "Aggregates recomputed", body = RefreshSummary),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn refresh_stats<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    admin: AdminUser,
    headers: HeaderMap,
) -> CatalogResult<Json<RefreshSummary>> {
    let summary = service.refresh_all_stats().await?;
    audit(&admin, &headers, "catalog.refresh_stats", "catalog".to_string())
        .with_details(summary)
        .log();
    Ok(Json(summary))
}
