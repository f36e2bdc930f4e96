use super::cookies::{ACCESS_COOKIE, cookie_value};
use super::jwt::{JwtAuth, TokenType};
use crate::errors::AppError;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Bearer token from `Authorization`, falling back to the `access_token` cookie
pub fn extract_token_from_request(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer ").map(|s| s.trim().to_string()))
        .or_else(|| {
            headers
                .get("cookie")
                .and_then(|v| v.to_str().ok())
                .and_then(|cookies| cookie_value(cookies, ACCESS_COOKIE))
        })
}

/// Reject the request unless it carries a valid access token.
///
/// ```ignore
/// let protected = Router::new()
///     .route("/api/protected", get(handler))
///     .layer(axum::middleware::from_fn_with_state(auth.clone(), jwt_auth_middleware));
/// ```
pub async fn jwt_auth_middleware(
    State(auth): State<JwtAuth>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_token_from_request(&headers) else {
        tracing::debug!("No JWT found in Authorization header or cookie");
        return AppError::Unauthorized("No token provided".to_string()).into_response();
    };

    match auth.authenticate(&token, TokenType::Access).await {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Attach claims when a valid access token is present, never reject.
///
/// Applied across the whole API; handlers decide through the
/// [`AuthUser`](super::AuthUser) and [`AdminUser`](super::AdminUser) extractors.
pub async fn authenticate(
    State(auth): State<JwtAuth>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_token_from_request(&headers) {
        match auth.authenticate(&token, TokenType::Access).await {
            Ok(claims) => {
                request.extensions_mut().insert(claims);
            }
            Err(e) => tracing::debug!("Ignoring unusable token: {}", e),
        }
    }

    next.run(request).await
}
