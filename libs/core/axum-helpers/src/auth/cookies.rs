use super::jwt::{ACCESS_TOKEN_TTL, REFRESH_TOKEN_TTL, TokenPair};
use crate::errors::AppError;
use axum::http::HeaderValue;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

fn cookie(name: &str, value: &str, max_age: i64, secure: bool) -> Result<HeaderValue, AppError> {
    let secure_flag = if secure { " Secure;" } else { "" };
    let raw = format!(
        "{}={}; HttpOnly;{} SameSite=Strict; Path=/; Max-Age={}",
        name, value, secure_flag, max_age
    );
    HeaderValue::from_str(&raw)
        .map_err(|e| AppError::InternalServerError(format!("Failed to create cookie: {}", e)))
}

/// `Set-Cookie` values for a freshly issued token pair
pub fn session_cookies(tokens: &TokenPair, secure: bool) -> Result<[HeaderValue; 2], AppError> {
    Ok([
        cookie(ACCESS_COOKIE, &tokens.access, ACCESS_TOKEN_TTL, secure)?,
        cookie(REFRESH_COOKIE, &tokens.refresh, REFRESH_TOKEN_TTL, secure)?,
    ])
}

pub fn clear_session_cookies(secure: bool) -> Result<[HeaderValue; 2], AppError> {
    Ok([
        cookie(ACCESS_COOKIE, "", 0, secure)?,
        cookie(REFRESH_COOKIE, "", 0, secure)?,
    ])
}

/// Extract cookie value by name from a `Cookie` header
pub fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|cookie| {
        let (key, value) = cookie.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}
