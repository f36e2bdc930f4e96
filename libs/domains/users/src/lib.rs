//! Users Domain
//!
//! Accounts and everything around them:
//!
//! - signup with email verification (accounts stay inactive until verified)
//! - login with a failed-attempt lockout, JWT access/refresh sessions, logout
//! - password reset through emailed, stateless one-time links
//! - profiles that include the user's favorites, read list, comments and ratings
//! - account administration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints, cookies, audit events
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐     ┌─────────────────────────────────────┐
//! │   Service   │ ──▶ │ Mailer, LoginAttemptStore, JwtAuth, │
//! └──────┬──────┘     │ UserActivity (interactions domain)  │
//!        │            └─────────────────────────────────────┘
//! ┌──────▼──────┐
//! │ Repository  │  ← Data access (trait + implementations)
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use axum_helpers::{JwtAuth, JwtConfig};
//! use domain_users::{AccountService, AccountsConfig, InMemoryUserRepository, handlers};
//!
//! let auth = JwtAuth::in_memory(&JwtConfig::new("a-development-secret-of-32-characters").unwrap());
//! let service = AccountService::new(InMemoryUserRepository::new(), auth, AccountsConfig::default());
//! let router: axum::Router = handlers::router(Arc::new(service));
//! ```

pub mod attempts;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod password;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod tokens;

pub use attempts::{InMemoryLoginAttemptStore, LoginAttemptStore, RedisLoginAttemptStore};
pub use config::AccountsConfig;
pub use error::{UserError, UserResult};
pub use mailer::{InMemoryMailer, LogMailer, MailMessage, Mailer};
pub use models::{
    AccessTokenResponse, AdminUserUpdate, ChangePasswordRequest, LoginRequest, LoginResponse,
    MessageResponse, PasswordResetConfirm, PasswordResetRequest, Role, SignupRequest, User,
    UserFilter, UserProfile, UserResponse, VerifyEmailResponse,
};
pub use postgres::PgUserRepository;
pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::AccountService;
pub use tokens::AccountTokenGenerator;
