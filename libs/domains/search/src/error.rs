use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use domain_catalog::CatalogError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    Gateway(String),

    /// The vector store answered with an empty result set
    #[error("No matching books found")]
    NoMatches,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub type SearchResult<T> = Result<T, SearchError>;

/// Transport and decode failures of the embedding API surface as embedding errors.
impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Embedding(err.to_string())
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::NoMatches => AppError::NotFound(err.to_string()),
            SearchError::Validation(msg) => AppError::BadRequest(msg),
            SearchError::Embedding(_) | SearchError::Gateway(_) => {
                AppError::InternalServerError(err.to_string())
            }
            SearchError::Catalog(inner) => inner.into(),
        }
    }
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
