//! Connectors for the bookshelf backing stores.
//!
//! # Features
//!
//! - `postgres` (default): catalog, accounts and interactions via SeaORM
//! - `redis` (default): token whitelist and login attempt counters
//! - `config`: `core_config::FromEnv` for the config structs
//!
//! ```ignore
//! use database::{postgres, redis, RetryConfig};
//!
//! let (db, cache) = tokio::try_join!(
//!     postgres::connect_from_config_with_retry(postgres_config, Some(RetryConfig::default())),
//!     redis::connect_from_config_with_retry(redis_config, None),
//! )?;
//! ```

pub mod common;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "redis")]
pub mod redis;

pub use common::{DatabaseError, DatabaseResult, RetryConfig};
