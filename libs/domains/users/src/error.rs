use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use domain_interactions::InteractionError;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(Uuid),

    /// Form-level validation failure; the message is returned as is
    #[error("{0}")]
    Validation(String),

    /// Password policy failures, one message per broken rule
    #[error("Password does not meet requirements: {}", .0.join(" "))]
    WeakPassword(Vec<String>),

    #[error("Email already exists")]
    DuplicateEmail(String),

    #[error("Username already exists")]
    DuplicateUsername(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, expired or revoked session token
    #[error("{0}")]
    Unauthorized(String),

    #[error("Current password is incorrect")]
    WrongPassword,

    #[error("Please verify your email first")]
    NotVerified,

    #[error("Account is not active. Please verify your email first")]
    AccountInactive,

    #[error("Email is already verified")]
    AlreadyVerified,

    /// The uid segment of an emailed link could not be decoded
    #[error("{0}")]
    MalformedLink(&'static str),

    /// An emailed link points at an account that no longer exists
    #[error("User not found")]
    LinkUserNotFound,

    #[error("Invalid or expired verification token")]
    InvalidVerificationToken,

    #[error("Invalid or expired reset link")]
    InvalidResetToken,

    #[error("No user found with this email")]
    UnknownEmail,

    #[error("New password must be different from current password")]
    PasswordUnchanged,

    #[error("Too many failed login attempts")]
    TooManyAttempts { wait: String },

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Email error: {0}")]
    Mail(String),

    #[error("Login attempt store error: {0}")]
    AttemptStore(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type UserResult<T> = Result<T, UserError>;

impl From<sea_orm::DbErr> for UserError {
    fn from(err: sea_orm::DbErr) -> Self {
        UserError::Internal(format!("Database error: {}", err))
    }
}

impl From<redis::RedisError> for UserError {
    fn from(err: redis::RedisError) -> Self {
        UserError::AttemptStore(err.to_string())
    }
}

impl From<InteractionError> for UserError {
    fn from(err: InteractionError) -> Self {
        UserError::Internal(err.to_string())
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(_) => AppError::NotFound("User not found".to_string()),
            UserError::WeakPassword(errors) => AppError::Invalid {
                message: "Password does not meet requirements".to_string(),
                details: json!(errors),
            },
            UserError::Unauthorized(msg) => AppError::Unauthorized(msg),
            UserError::TooManyAttempts { wait } => AppError::TooManyRequests {
                message: "Too many failed login attempts".to_string(),
                details: Some(json!({ "wait_time": wait })),
            },
            UserError::PasswordHash(msg) | UserError::Token(msg) | UserError::Internal(msg) => {
                AppError::InternalServerError(msg)
            }
            UserError::Mail(msg) => {
                AppError::InternalServerError(format!("Failed to send email: {}", msg))
            }
            UserError::AttemptStore(msg) => {
                tracing::error!("Login attempt store error: {}", msg);
                AppError::ServiceUnavailable("Service temporarily unavailable".to_string())
            }
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_form_errors_are_bad_requests() {
        for err in [
            UserError::Validation("All fields are required".to_string()),
            UserError::DuplicateEmail("a@example.com".to_string()),
            UserError::InvalidCredentials,
            UserError::MalformedLink("Invalid verification link"),
            UserError::LinkUserNotFound,
        ] {
            assert_eq!(AppError::from(err).status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_lockout_carries_wait_time() {
        let err: AppError = UserError::TooManyAttempts {
            wait: "15 minutes".to_string(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        match err {
            AppError::TooManyRequests { details, .. } => {
                assert_eq!(details.unwrap()["wait_time"], "15 minutes");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_user_is_404() {
        let err: AppError = UserError::NotFound(Uuid::now_v7()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
