use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Book not found: {0}")]
    BookNotFound(Uuid),

    #[error("Author not found: {0}")]
    AuthorNotFound(Uuid),

    #[error("Category not found: {0}")]
    CategoryNotFound(Uuid),

    /// A book references an author that does not exist
    #[error("Unknown author: {0}")]
    UnknownAuthor(Uuid),

    #[error("Unknown category: {0}")]
    UnknownCategory(Uuid),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl From<sea_orm::DbErr> for CatalogError {
    fn from(err: sea_orm::DbErr) -> Self {
        CatalogError::Internal(format!("Database error: {}", err))
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::BookNotFound(_) => AppError::NotFound("Book not found".to_string()),
            CatalogError::AuthorNotFound(_) => AppError::NotFound("Author not found".to_string()),
            CatalogError::CategoryNotFound(_) => {
                AppError::NotFound("Category not found".to_string())
            }
            CatalogError::UnknownAuthor(id) => {
                AppError::BadRequest(format!("Author {} does not exist", id))
            }
            CatalogError::UnknownCategory(id) => {
                AppError::BadRequest(format!("Category {} does not exist", id))
            }
            CatalogError::Validation(msg) => AppError::BadRequest(msg),
            CatalogError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
