use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use domain_catalog::CatalogError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("Book not found: {0}")]
    BookNotFound(Uuid),

    #[error("No rating for book {0}")]
    RatingNotFound(Uuid),

    #[error("Comment not found: {0}")]
    CommentNotFound(Uuid),

    /// The caller does not own the comment
    #[error("Not allowed to modify comment {0}")]
    NotCommentOwner(Uuid),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InteractionResult<T> = Result<T, InteractionError>;

impl From<sea_orm::DbErr> for InteractionError {
    fn from(err: sea_orm::DbErr) -> Self {
        InteractionError::Internal(format!("Database error: {}", err))
    }
}

impl From<CatalogError> for InteractionError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::BookNotFound(id) => InteractionError::BookNotFound(id),
            CatalogError::Validation(msg) => InteractionError::Validation(msg),
            other => InteractionError::Internal(other.to_string()),
        }
    }
}

impl From<InteractionError> for AppError {
    fn from(err: InteractionError) -> Self {
        match err {
            InteractionError::BookNotFound(_) => AppError::NotFound("Book not found".to_string()),
            InteractionError::RatingNotFound(_) => {
                AppError::NotFound("Rating not found".to_string())
            }
            InteractionError::CommentNotFound(_) => {
                AppError::NotFound("Comment not found".to_string())
            }
            InteractionError::NotCommentOwner(_) => AppError::Forbidden(
                "You do not have permission to modify this comment".to_string(),
            ),
            InteractionError::Validation(msg) => AppError::BadRequest(msg),
            InteractionError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for InteractionError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
