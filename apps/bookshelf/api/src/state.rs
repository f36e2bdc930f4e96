//! Application state management.
//!
//! The state holds configuration and the shared connection handles. Domain
//! services are built from it once in [`crate::api::routes`].

use axum_helpers::JwtAuth;

/// Shared application state.
///
/// Cloning is cheap: connections are pooled handles and `JwtAuth` shares its
/// token store.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded from environment variables
    pub config: crate::config::Config,
    /// PostgreSQL database connection pool
    pub db: database::postgres::DatabaseConnection,
    /// Redis connection manager (token whitelist and login attempt counters)
    pub redis: database::redis::ConnectionManager,
    /// JWT issuing and verification backed by Redis
    pub jwt_auth: JwtAuth,
}
