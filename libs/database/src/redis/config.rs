#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_required};

#[derive(Clone, Debug)]
pub struct RedisConfig {
    /// e.g. `redis://:password@localhost:6379/0`
    pub url: String,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// - `REDIS_URL` (required)
#[cfg(feature = "config")]
impl FromEnv for RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(env_required("REDIS_URL")?))
    }
}
