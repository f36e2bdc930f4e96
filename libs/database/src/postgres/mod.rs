//! PostgreSQL connection management (SeaORM).
//!
//! The schema is owned by an external migration tool; this module only connects
//! and checks health.

mod config;
mod connector;
mod health;

pub use config::PostgresConfig;
pub use connector::{connect, connect_from_config, connect_from_config_with_retry};
pub use health::check_health;

pub use sea_orm::{ConnectOptions, DatabaseConnection, DbErr};
