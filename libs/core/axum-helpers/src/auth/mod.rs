//! Authentication and authorization.
//!
//! - JWT access/refresh tokens backed by a whitelist/blacklist [`TokenStore`]
//!   (Redis in production, in-memory for tests)
//! - [`authenticate`] middleware that attaches [`JwtClaims`] when a valid access
//!   token is presented, and [`jwt_auth_middleware`] that insists on one
//! - [`AuthUser`] / [`AdminUser`] extractors producing 401 / 403
//!
//! ```ignore
//! use axum_helpers::auth::{JwtAuth, JwtConfig, authenticate};
//! use core_config::FromEnv;
//!
//! let auth = JwtAuth::with_redis(redis_manager, &JwtConfig::from_env()?);
//!
//! let app = Router::new()
//!     .route("/me/library", get(library))
//!     .layer(axum::middleware::from_fn_with_state(auth, authenticate));
//! ```

pub mod config;
pub mod cookies;
pub mod extractors;
pub mod jwt;
pub mod middleware;
pub mod store;

pub use config::JwtConfig;
pub use cookies::{clear_session_cookies, cookie_value, session_cookies};
pub use extractors::{ADMIN_ROLE, AdminUser, AuthUser};
pub use jwt::{ACCESS_TOKEN_TTL, JwtAuth, JwtClaims, REFRESH_TOKEN_TTL, TokenPair, TokenSubject, TokenType};
pub use middleware::{authenticate, extract_token_from_request, jwt_auth_middleware};
pub use store::{InMemoryTokenStore, RedisTokenStore, TokenStore};
