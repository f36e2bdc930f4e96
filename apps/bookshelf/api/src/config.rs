use axum_helpers::JwtConfig;
use core_config::{AppInfo, FromEnv, app_info, server::ServerConfig};
use domain_search::{EmbeddingConfig, VectorStoreConfig};
use domain_users::AccountsConfig;

// Import database configs from the database library
use database::postgres::PostgresConfig;
use database::redis::RedisConfig;

pub use core_config::Environment;

/// Application configuration, composed from each library's `FromEnv` section
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub database: PostgresConfig,
    pub redis: RedisConfig,
    pub server: ServerConfig,
    pub environment: Environment,
    pub jwt: JwtConfig,
    pub accounts: AccountsConfig,
    pub embedding: EmbeddingConfig,
    pub vector_store: VectorStoreConfig,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let database = PostgresConfig::from_env()?; // Required - will fail if not set
        let server = ServerConfig::from_env()?; // Uses defaults: HOST=0.0.0.0, PORT=8080
        let redis = RedisConfig::from_env()?; // Required - will fail if not set
        let jwt = JwtConfig::from_env()?;

        Ok(Self {
            app: app_info!(),
            database,
            redis,
            server,
            environment,
            jwt,
            accounts: AccountsConfig::from_env()?,
            embedding: EmbeddingConfig::from_env()?,
            vector_store: VectorStoreConfig::from_env()?,
        })
    }
}
