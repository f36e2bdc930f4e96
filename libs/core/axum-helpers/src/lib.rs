//! # Axum Helpers
//!
//! Shared plumbing for the HTTP services in this workspace.
//!
//! - **[`auth`]**: JWT access/refresh tokens with a revocable whitelist, auth extractors
//! - **[`server`]**: router assembly with OpenAPI docs, health checks, graceful shutdown
//! - **[`http`]**: CORS and security headers
//! - **[`errors`]**: `AppError` and the standard `ErrorResponse` body
//! - **[`extractors`]**: UUID path and validated JSON extractors
//! - **[`audit`]**: audit logging for security-relevant actions

pub mod audit;
pub mod auth;
pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use auth::{
    ACCESS_TOKEN_TTL, AdminUser, AuthUser, InMemoryTokenStore, JwtAuth, JwtClaims, JwtConfig,
    REFRESH_TOKEN_TTL, RedisTokenStore, TokenPair, TokenStore, TokenSubject, TokenType,
    authenticate, jwt_auth_middleware,
};

pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, create_app, create_production_app,
    create_router, health_router, run_health_checks, shutdown_signal,
};

pub use http::{create_cors_layer, security_headers};

pub use errors::{AppError, ErrorCode, ErrorResponse};

pub use extractors::{UuidPath, ValidatedJson};

pub use audit::{AuditEvent, AuditOutcome, extract_ip_from_headers, extract_user_agent};
