//! Stateless one-time tokens for emailed links (email verification, password reset)
//!
//! A token is `"{timestamp_base36}-{digest}"`. The digest is a SHA-256 over the
//! signing secret, the user id, the password hash, the activation flag and the
//! timestamp, so a token stops working once the password changes or the
//! account is activated. Nothing is stored server-side.

use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::User;

#[derive(Clone)]
pub struct AccountTokenGenerator {
    secret: String,
    ttl_secs: u64,
}

impl AccountTokenGenerator {
    pub fn new(secret: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs,
        }
    }

    pub fn make_token(&self, user: &User) -> String {
        self.make_token_at(user, Utc::now().timestamp().max(0) as u64)
    }

    pub fn check_token(&self, user: &User, token: &str) -> bool {
        self.check_token_at(user, token, Utc::now().timestamp().max(0) as u64)
    }

    fn make_token_at(&self, user: &User, timestamp: u64) -> String {
        format!("{}-{}", to_base36(timestamp), self.digest(user, timestamp))
    }

    fn check_token_at(&self, user: &User, token: &str, now: u64) -> bool {
        let Some((ts, digest)) = token.split_once('-') else {
            return false;
        };
        let Some(timestamp) = from_base36(ts) else {
            return false;
        };

        let expected = self.digest(user, timestamp);
        if !constant_time_eq(expected.as_bytes(), digest.as_bytes()) {
            return false;
        }

        timestamp <= now && now - timestamp <= self.ttl_secs
    }

    fn digest(&self, user: &User, timestamp: u64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(user.id.as_bytes());
        hasher.update(user.password_hash.as_bytes());
        hasher.update([u8::from(user.is_active)]);
        hasher.update(timestamp.to_be_bytes());
        const_hex::encode(hasher.finalize())
    }
}

/// uid path segment of an emailed link
pub fn encode_uid(id: Uuid) -> String {
    const_hex::encode(id.as_bytes())
}

pub fn decode_uid(uid: &str) -> Option<Uuid> {
    let bytes = const_hex::decode(uid).ok()?;
    Uuid::from_slice(&bytes).ok()
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

fn from_base36(value: &str) -> Option<u64> {
    if value.is_empty() || value.len() > 13 {
        return None;
    }
    u64::from_str_radix(value, 36).ok()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: u64 = 259_200;

    fn user() -> User {
        User::new(
            "clarice".to_string(),
            "clarice@example.com".to_string(),
            "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        )
    }

    fn generator() -> AccountTokenGenerator {
        AccountTokenGenerator::new("account-token-test-secret", TTL)
    }

    #[test]
    fn test_token_round_trip() {
        let user = user();
        let token = generator().make_token(&user);
        assert!(generator().check_token(&user, &token));
    }

    #[test]
    fn test_token_format() {
        let token = generator().make_token_at(&user(), 1_700_000_000);
        let (ts, digest) = token.split_once('-').unwrap();
        assert_eq!(from_base36(ts), Some(1_700_000_000));
        assert_eq!(digest.len(), 64);
    }

    #[test]
    fn test_token_expires() {
        let user = user();
        let token = generator().make_token_at(&user, 1_000);
        assert!(generator().check_token_at(&user, &token, 1_000 + TTL));
        assert!(!generator().check_token_at(&user, &token, 1_001 + TTL));
    }

    #[test]
    fn test_token_invalidated_by_password_change() {
        let mut user = user();
        let token = generator().make_token(&user);
        user.password_hash = "$argon2id$v=19$m=19456,t=2,p=1$b3RoZXI$b3RoZXI".to_string();
        assert!(!generator().check_token(&user, &token));
    }

    #[test]
    fn test_token_invalidated_by_activation() {
        let mut user = user();
        let token = generator().make_token(&user);
        user.is_active = true;
        assert!(!generator().check_token(&user, &token));
    }

    #[test]
    fn test_token_bound_to_secret() {
        let user = user();
        let token = generator().make_token(&user);
        let other = AccountTokenGenerator::new("a-different-signing-secret", TTL);
        assert!(!other.check_token(&user, &token));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let user = user();
        for token in ["", "nodash", "-abc", "zzzzzzzzzzzzzzzz-abc", "1-"] {
            assert!(!generator().check_token(&user, token), "{token}");
        }
    }

    #[test]
    fn test_uid_round_trip() {
        let id = Uuid::now_v7();
        assert_eq!(decode_uid(&encode_uid(id)), Some(id));
        assert_eq!(decode_uid("not-hex"), None);
        assert_eq!(decode_uid("abcd"), None);
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
