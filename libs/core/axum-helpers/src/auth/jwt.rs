use super::config::JwtConfig;
use super::store::{InMemoryTokenStore, RedisTokenStore, TokenStore};
use crate::errors::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// JWT token time-to-live constants
pub const ACCESS_TOKEN_TTL: i64 = 900; // 15 minutes
pub const REFRESH_TOKEN_TTL: i64 = 604800; // 7 days

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn ttl(&self) -> i64 {
        match self {
            TokenType::Access => ACCESS_TOKEN_TTL,
            TokenType::Refresh => REFRESH_TOKEN_TTL,
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,        // user id
    pub email: String,
    pub name: String,       // username
    pub roles: Vec<String>,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,        // whitelist/blacklist key
    pub typ: TokenType,
}

impl JwtClaims {
    /// Seconds left before expiry, never negative
    pub fn remaining_ttl(&self) -> u64 {
        (self.exp - Utc::now().timestamp()).max(0) as u64
    }
}

/// Identity a token is issued for
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
}

/// Access + refresh token returned after login or email verification
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

/// Stateless JWT signing combined with a revocable token store.
#[derive(Clone)]
pub struct JwtAuth {
    secret: Arc<str>,
    store: Arc<dyn TokenStore>,
}

impl JwtAuth {
    pub fn new(store: Arc<dyn TokenStore>, config: &JwtConfig) -> Self {
        Self {
            secret: Arc::from(config.secret.as_str()),
            store,
        }
    }

    /// Redis whitelist/blacklist, used by the running service.
    pub fn with_redis(manager: ConnectionManager, config: &JwtConfig) -> Self {
        tracing::info!("JWT + Redis auth initialized");
        Self::new(Arc::new(RedisTokenStore::new(manager)), config)
    }

    pub fn in_memory(config: &JwtConfig) -> Self {
        Self::new(Arc::new(InMemoryTokenStore::new()), config)
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn create_token(&self, subject: &TokenSubject, typ: TokenType) -> eyre::Result<(String, JwtClaims)> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: subject.user_id.clone(),
            email: subject.email.clone(),
            name: subject.name.clone(),
            roles: subject.roles.clone(),
            exp: (now + Duration::seconds(typ.ttl())).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            typ,
        };

        let header = Header {
            alg: jsonwebtoken::Algorithm::HS256,
            ..Default::default()
        };

        let token = encode(
            &header,
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok((token, claims))
    }

    /// Create a token and whitelist its `jti` for the token lifetime.
    pub async fn issue_token(&self, subject: &TokenSubject, typ: TokenType) -> eyre::Result<String> {
        let (token, claims) = self.create_token(subject, typ)?;
        self.store
            .whitelist(&claims.jti, &claims.sub, typ.ttl() as u64)
            .await?;
        Ok(token)
    }

    pub async fn issue_token_pair(&self, subject: &TokenSubject) -> eyre::Result<TokenPair> {
        let access = self.issue_token(subject, TokenType::Access).await?;
        let refresh = self.issue_token(subject, TokenType::Refresh).await?;
        tracing::debug!(user_id = %subject.user_id, "Issued token pair");
        Ok(TokenPair { refresh, access })
    }

    /// Verify JWT signature and expiry, then decode claims
    pub fn verify_token(&self, token: &str) -> eyre::Result<JwtClaims> {
        let token_data = decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }

    /// Full check: signature, expected type, blacklist, whitelist.
    pub async fn authenticate(&self, token: &str, expected: TokenType) -> Result<JwtClaims, AppError> {
        let claims = self.verify_token(token).map_err(|e| {
            tracing::debug!("JWT verification failed: {}", e);
            AppError::Unauthorized("Invalid token".to_string())
        })?;

        if claims.typ != expected {
            return Err(AppError::Unauthorized("Wrong token type".to_string()));
        }

        let blacklisted = self.store.is_blacklisted(&claims.jti).await.map_err(store_error)?;
        if blacklisted {
            tracing::debug!(jti = %claims.jti, "Token is blacklisted");
            return Err(AppError::Unauthorized("Token has been revoked".to_string()));
        }

        let whitelisted = self.store.is_whitelisted(&claims.jti).await.map_err(store_error)?;
        if !whitelisted {
            tracing::debug!(jti = %claims.jti, "Token is not whitelisted");
            return Err(AppError::Unauthorized("Token not found".to_string()));
        }

        Ok(claims)
    }

    /// Remove from the whitelist and blacklist for the remaining lifetime.
    pub async fn revoke(&self, claims: &JwtClaims) -> eyre::Result<()> {
        self.store.revoke(&claims.jti).await?;
        self.store.blacklist(&claims.jti, claims.remaining_ttl()).await?;
        tracing::debug!(jti = %claims.jti, "Revoked and blacklisted token");
        Ok(())
    }

    /// Best-effort revocation of a raw token; invalid tokens are ignored.
    pub async fn revoke_raw(&self, token: &str) {
        if let Ok(claims) = self.verify_token(token)
            && let Err(e) = self.revoke(&claims).await
        {
            tracing::warn!(jti = %claims.jti, "Failed to revoke token: {}", e);
        }
    }
}

fn store_error(e: eyre::Report) -> AppError {
    tracing::error!("Token store error: {}", e);
    AppError::ServiceUnavailable("Service temporarily unavailable".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> JwtAuth {
        JwtAuth::in_memory(&JwtConfig::new("this-is-a-valid-secret-with-32-chars!").unwrap())
    }

    fn subject() -> TokenSubject {
        TokenSubject {
            user_id: Uuid::now_v7().to_string(),
            email: "reader@example.com".to_string(),
            name: "reader".to_string(),
            roles: vec!["user".to_string()],
        }
    }

    #[tokio::test]
    async fn test_issued_pair_authenticates_by_type() {
        let auth = auth();
        let pair = auth.issue_token_pair(&subject()).await.unwrap();

        let claims = auth.authenticate(&pair.access, TokenType::Access).await.unwrap();
        assert_eq!(claims.email, "reader@example.com");
        assert!(auth.authenticate(&pair.refresh, TokenType::Refresh).await.is_ok());

        let err = auth.authenticate(&pair.refresh, TokenType::Access).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_revoked_token_is_rejected() {
        let auth = auth();
        let pair = auth.issue_token_pair(&subject()).await.unwrap();

        auth.revoke_raw(&pair.access).await;
        let err = auth.authenticate(&pair.access, TokenType::Access).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref msg) if msg.contains("revoked")));
    }

    #[tokio::test]
    async fn test_unwhitelisted_token_is_rejected() {
        let auth = auth();
        let (token, _) = auth.create_token(&subject(), TokenType::Access).unwrap();
        assert!(auth.authenticate(&token, TokenType::Access).await.is_err());
    }

    #[test]
    fn test_token_signed_with_other_secret_fails() {
        let other = JwtAuth::in_memory(&JwtConfig::new("another-valid-secret-with-32-chars!!").unwrap());
        let (token, _) = other.create_token(&subject(), TokenType::Access).unwrap();
        assert!(auth().verify_token(&token).is_err());
    }
}
