//! Password hashing and strength rules

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::{UserError, UserResult};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Frequently leaked passwords, compared case-insensitively
const COMMON_PASSWORDS: &[&str] = &[
    "123456", "12345678", "123456789", "1234567890", "password", "password1", "password123",
    "qwerty", "qwerty123", "qwertyuiop", "abc123", "111111", "000000", "iloveyou", "admin",
    "admin123", "welcome", "welcome1", "letmein", "monkey", "dragon", "football", "baseball",
    "sunshine", "princess", "master", "shadow", "superman", "trustno1", "starwars", "passw0rd",
    "p@ssw0rd", "1q2w3e4r", "zaq12wsx", "asdfghjkl", "changeme", "whatever", "freedom",
    "michael", "jennifer", "hello123", "loveyou", "secret", "test1234", "computer",
];

pub fn hash_password(password: &str) -> UserResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserError::PasswordHash(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> UserResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| UserError::PasswordHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Every broken rule, in a stable order. Empty when the password is acceptable.
pub fn password_problems(password: &str, username: Option<&str>) -> Vec<String> {
    let mut problems = Vec::new();
    let length = password.chars().count();

    if let Some(username) = username.map(str::trim).filter(|u| u.len() >= 3)
        && password.to_lowercase().contains(&username.to_lowercase())
    {
        problems.push("The password is too similar to the username.".to_string());
    }
    if length < MIN_PASSWORD_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {} characters.",
            MIN_PASSWORD_LENGTH
        ));
    }
    if length > MAX_PASSWORD_LENGTH {
        problems.push(format!(
            "This password is too long. It must contain at most {} characters.",
            MAX_PASSWORD_LENGTH
        ));
    }
    let lowered = password.trim().to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        problems.push("This password is too common.".to_string());
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }

    problems
}

pub fn validate_password(password: &str, username: Option<&str>) -> UserResult<()> {
    let problems = password_problems(password, username);
    if problems.is_empty() {
        Ok(())
    } else {
        Err(UserError::WeakPassword(problems))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse battery", &hash).unwrap());
        assert!(!verify_password("wrong horse battery", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same-password-twice").unwrap();
        let b = hash_password("same-password-twice").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(UserError::PasswordHash(_))
        ));
    }

    #[test]
    fn test_strong_password_passes() {
        assert!(password_problems("lantern-orchard-47", Some("reader")).is_empty());
    }

    #[test]
    fn test_short_numeric_password_reports_every_rule() {
        let problems = password_problems("1234567", None);
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("too short"));
        assert!(problems[1].contains("entirely numeric"));
    }

    #[test]
    fn test_common_password_rejected() {
        let problems = password_problems("Password123", None);
        assert_eq!(problems, vec!["This password is too common.".to_string()]);
    }

    #[test]
    fn test_password_containing_username_rejected() {
        let problems = password_problems("xx-Borges-1899", Some("borges"));
        assert_eq!(problems[0], "The password is too similar to the username.");
    }

    #[test]
    fn test_too_long_password_rejected() {
        let long = "a1-".repeat(50);
        assert!(
            password_problems(&long, None)
                .iter()
                .any(|p| p.contains("too long"))
        );
    }

    #[test]
    fn test_validate_password_wraps_problems() {
        match validate_password("short", None) {
            Err(UserError::WeakPassword(problems)) => assert_eq!(problems.len(), 1),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
