use core_config::{ConfigError, Environment, FromEnv, env_or_default, env_parse};

/// Account flow settings.
///
/// - `FRONTEND_URL` (default `http://localhost:3000`): base of emailed links
/// - `DEFAULT_FROM_EMAIL` (default `no-reply@bookshelf.local`)
/// - `LOGIN_MAX_ATTEMPTS` (default 5) and `LOGIN_LOCKOUT_SECS` (default 900)
/// - `ACCOUNT_TOKEN_TTL_SECS` (default 259200, three days)
///
/// Session cookies are marked `Secure` when `APP_ENV=production`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountsConfig {
    pub frontend_url: String,
    pub from_email: String,
    pub max_login_attempts: u32,
    pub lockout_secs: u64,
    pub token_ttl_secs: u64,
    pub secure_cookies: bool,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:3000".to_string(),
            from_email: "no-reply@bookshelf.local".to_string(),
            max_login_attempts: 5,
            lockout_secs: 900,
            token_ttl_secs: 259_200,
            secure_cookies: false,
        }
    }
}

impl AccountsConfig {
    pub fn verification_link(&self, uid: &str, token: &str) -> String {
        format!("{}/verify-email/{}/{}/", self.base_url(), uid, token)
    }

    pub fn reset_link(&self, uid: &str, token: &str) -> String {
        format!("{}/reset-password/{}/{}/", self.base_url(), uid, token)
    }

    /// Human readable lockout, e.g. "15 minutes"; seconds unless it is a whole number of minutes
    pub fn lockout_wait(&self) -> String {
        let secs = self.lockout_secs;
        match (secs / 60, secs % 60) {
            (1, 0) => "1 minute".to_string(),
            (minutes, 0) if minutes > 0 => format!("{} minutes", minutes),
            _ if secs == 1 => "1 second".to_string(),
            _ => format!("{} seconds", secs),
        }
    }

    fn base_url(&self) -> &str {
        self.frontend_url.trim_end_matches('/')
    }
}

impl FromEnv for AccountsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            frontend_url: env_or_default("FRONTEND_URL", &defaults.frontend_url),
            from_email: env_or_default("DEFAULT_FROM_EMAIL", &defaults.from_email),
            max_login_attempts: env_parse("LOGIN_MAX_ATTEMPTS", defaults.max_login_attempts)?,
            lockout_secs: env_parse("LOGIN_LOCKOUT_SECS", defaults.lockout_secs)?,
            token_ttl_secs: env_parse("ACCOUNT_TOKEN_TTL_SECS", defaults.token_ttl_secs)?,
            secure_cookies: Environment::from_env().use_https(),
        };

        if config.max_login_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "LOGIN_MAX_ATTEMPTS".to_string(),
                details: "must be at least 1".to_string(),
            });
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 6] = [
        "FRONTEND_URL",
        "DEFAULT_FROM_EMAIL",
        "LOGIN_MAX_ATTEMPTS",
        "LOGIN_LOCKOUT_SECS",
        "ACCOUNT_TOKEN_TTL_SECS",
        "APP_ENV",
    ];

    #[test]
    fn test_defaults_when_unset() {
        temp_env::with_vars_unset(VARS, || {
            assert_eq!(AccountsConfig::from_env().unwrap(), AccountsConfig::default());
        });
    }

    #[test]
    fn test_reads_overrides() {
        temp_env::with_vars(
            [
                ("FRONTEND_URL", Some("https://books.example.org/")),
                ("LOGIN_MAX_ATTEMPTS", Some("3")),
                ("LOGIN_LOCKOUT_SECS", Some("60")),
                ("APP_ENV", Some("production")),
            ],
            || {
                let config = AccountsConfig::from_env().unwrap();
                assert_eq!(config.max_login_attempts, 3);
                assert_eq!(config.lockout_wait(), "1 minute");
                assert!(config.secure_cookies);
                assert_eq!(
                    config.verification_link("abc", "1-ff"),
                    "https://books.example.org/verify-email/abc/1-ff/"
                );
            },
        );
    }

    #[test]
    fn test_rejects_unparsable_number() {
        temp_env::with_var("LOGIN_LOCKOUT_SECS", Some("soon"), || {
            let err = AccountsConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("LOGIN_LOCKOUT_SECS"));
        });
    }

    #[test]
    fn test_rejects_zero_attempts() {
        temp_env::with_var("LOGIN_MAX_ATTEMPTS", Some("0"), || {
            assert!(AccountsConfig::from_env().is_err());
        });
    }

    #[test]
    fn test_wait_never_understates_partial_minutes() {
        let wait = |lockout_secs| {
            AccountsConfig {
                lockout_secs,
                ..Default::default()
            }
            .lockout_wait()
        };

        assert_eq!(wait(90), "90 seconds");
        assert_eq!(wait(45), "45 seconds");
        assert_eq!(wait(1), "1 second");
        assert_eq!(wait(120), "2 minutes");
    }

    #[test]
    fn test_default_wait_is_fifteen_minutes() {
        let config = AccountsConfig::default();
        assert_eq!(config.lockout_wait(), "15 minutes");
        assert_eq!(
            config.reset_link("u", "t"),
            "http://localhost:3000/reset-password/u/t/"
        );
    }
}
