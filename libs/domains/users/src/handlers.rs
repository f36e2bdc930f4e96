use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use axum_helpers::{
    AdminUser, AppError, AuditEvent, AuditOutcome, AuthUser, TokenPair, UuidPath, ValidatedJson,
    auth::{
        clear_session_cookies, cookie_value, cookies::REFRESH_COOKIE, extract_token_from_request,
        session_cookies,
    },
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, ForbiddenResponse,
        InternalServerErrorResponse, NotFoundResponse, TooManyRequestsResponse,
        UnauthorizedResponse,
    },
};
use serde_json::json;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::{UserError, UserResult};
use crate::models::{
    AccessTokenResponse, AdminUserUpdate, ChangePasswordRequest, LoginRequest, LoginResponse,
    MessageResponse, PasswordResetConfirm, PasswordResetRequest, RefreshRequest, Role,
    SignupRequest, UserFilter, UserProfile, UserResponse, VerifyEmailResponse,
};
use crate::repository::UserRepository;
use crate::service::AccountService;

#[derive(OpenApi)]
#[openapi(
    paths(
        signup,
        verify_email,
        login,
        logout,
        refresh_token,
        me,
        request_password_reset,
        confirm_password_reset,
        get_profile,
        change_password,
        delete_me,
        admin_list_users,
        admin_get_user,
        admin_update_user,
        admin_delete_user,
    ),
    components(
        schemas(
            SignupRequest, LoginRequest, LoginResponse, MessageResponse, VerifyEmailResponse,
            TokenPair, RefreshRequest, AccessTokenResponse, PasswordResetRequest,
            PasswordResetConfirm, ChangePasswordRequest, UserResponse, UserProfile,
            AdminUserUpdate, UserFilter, Role
        ),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            TooManyRequestsResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "auth", description = "Signup, email verification, sessions and password reset"),
        (name = "users", description = "Profiles and account settings"),
        (name = "users-admin", description = "Account administration")
    )
)]
pub struct ApiDoc;

type SharedService<R> = Arc<AccountService<R>>;

pub fn router<R: UserRepository + 'static>(service: SharedService<R>) -> Router {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/verify-email/{uid}/{token}", get(verify_email))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/token/refresh", post(refresh_token))
        .route("/auth/me", get(me))
        .route("/auth/password-reset", post(request_password_reset))
        .route("/auth/password-reset/{uid}/{token}", post(confirm_password_reset))
        .route("/users/me", delete(delete_me))
        .route("/users/me/password", put(change_password))
        .route("/users/{id}", get(get_profile))
        .route("/admin/users", get(admin_list_users))
        .route(
            "/admin/users/{id}",
            get(admin_get_user)
                .put(admin_update_user)
                .delete(admin_delete_user),
        )
        .with_state(service)
}

fn with_cookies(mut response: Response, cookies: [header::HeaderValue; 2]) -> Response {
    for cookie in cookies {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

/// Optional JSON body; empty or unreadable bodies count as absent
fn refresh_from_body(body: &Bytes) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    serde_json::from_slice::<RefreshRequest>(body)
        .ok()
        .and_then(|r| r.refresh)
        .filter(|t| !t.is_empty())
}

fn refresh_from_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| cookie_value(cookies, REFRESH_COOKIE))
}

/// Register an inactive account and mail its verification link
#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = MessageResponse),
        (status = 400, response = BadRequestValidationResponse)
    )
)]
async fn signup<R: UserRepository>(
    State(service): State<SharedService<R>>,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<SignupRequest>,
) -> UserResult<impl IntoResponse> {
    let email = input.email.trim().to_string();
    let user = match service.signup(input).await {
        Ok(user) => user,
        Err(e) => {
            if matches!(e, UserError::DuplicateEmail(_) | UserError::DuplicateUsername(_)) {
                AuditEvent::new(
                    None,
                    "user.signup",
                    Some(format!("email:{}", email)),
                    AuditOutcome::Failure,
                )
                .with_request(&headers)
                .with_details(json!({ "reason": e.to_string() }))
                .log();
            }
            return Err(e);
        }
    };

    AuditEvent::new(
        Some(user.id.to_string()),
        "user.signup",
        Some(format!("email:{}", user.email)),
        AuditOutcome::Success,
    )
    .with_request(&headers)
    .log();

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "User created. Please check your email to activate your account.",
        )),
    ))
}

/// Activate an account from its emailed link and sign the user in
#[utoipa::path(
    get,
    path = "/auth/verify-email/{uid}/{token}",
    tag = "auth",
    params(
        ("uid" = String, Path, description = "Encoded user ID"),
        ("token" = String, Path, description = "Verification token")
    ),
    responses(
        (status = 200, description = "Email verified", body = VerifyEmailResponse),
        (status = 400, response = BadRequestValidationResponse)
    )
)]
async fn verify_email<R: UserRepository>(
    State(service): State<SharedService<R>>,
    headers: HeaderMap,
    Path((uid, token)): Path<(String, String)>,
) -> UserResult<Json<VerifyEmailResponse>> {
    let (user, tokens) = service.verify_email(&uid, &token).await?;

    AuditEvent::new(
        Some(user.id.to_string()),
        "user.verify_email",
        None,
        AuditOutcome::Success,
    )
    .with_request(&headers)
    .log();

    Ok(Json(VerifyEmailResponse {
        message: "Email verified successfully".to_string(),
        tokens,
    }))
}

/// Sign in with email and password; sets HttpOnly session cookies
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 429, response = TooManyRequestsResponse)
    )
)]
async fn login<R: UserRepository>(
    State(service): State<SharedService<R>>,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<LoginRequest>,
) -> Result<Response, AppError> {
    let email = input.email.trim().to_lowercase();

    let (user, tokens) = match service.login(input).await {
        Ok(session) => session,
        Err(e) => {
            let outcome = match e {
                UserError::TooManyAttempts { .. } => Some(AuditOutcome::Denied),
                UserError::InvalidCredentials | UserError::NotVerified => {
                    Some(AuditOutcome::Failure)
                }
                _ => None,
            };
            if let Some(outcome) = outcome {
                AuditEvent::new(None, "user.login", Some(format!("email:{}", email)), outcome)
                    .with_request(&headers)
                    .with_details(json!({ "reason": e.to_string() }))
                    .log();
            }
            return Err(e.into());
        }
    };

    AuditEvent::new(
        Some(user.id.to_string()),
        "user.login",
        None,
        AuditOutcome::Success,
    )
    .with_request(&headers)
    .log();

    let cookies = session_cookies(&tokens, service.config().secure_cookies)?;
    let body = Json(LoginResponse {
        username: user.username,
        email: user.email,
        refresh: tokens.refresh,
        access: tokens.access,
    });
    Ok(with_cookies(body.into_response(), cookies))
}

/// Revoke the presented tokens and clear session cookies
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    request_body(content = RefreshRequest, description = "Optional refresh token"),
    responses((status = 204, description = "Signed out"))
)]
async fn logout<R: UserRepository>(
    State(service): State<SharedService<R>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let tokens: Vec<String> = [
        extract_token_from_request(&headers),
        refresh_from_cookie(&headers),
        refresh_from_body(&body),
    ]
    .into_iter()
    .flatten()
    .collect();

    let user_id = tokens
        .first()
        .and_then(|t| service.auth().verify_token(t).ok())
        .map(|claims| claims.sub);
    service.logout(&tokens).await;

    AuditEvent::new(user_id, "user.logout", None, AuditOutcome::Success)
        .with_request(&headers)
        .with_details(json!({ "revoked": tokens.len() }))
        .log();

    let cookies = clear_session_cookies(service.config().secure_cookies)?;
    Ok(with_cookies(StatusCode::NO_CONTENT.into_response(), cookies))
}

/// Exchange a refresh token (body or cookie) for a new access token
#[utoipa::path(
    post,
    path = "/auth/token/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 401, response = UnauthorizedResponse)
    )
)]
async fn refresh_token<R: UserRepository>(
    State(service): State<SharedService<R>>,
    headers: HeaderMap,
    body: Bytes,
) -> UserResult<Json<AccessTokenResponse>> {
    let token = refresh_from_body(&body)
        .or_else(|| refresh_from_cookie(&headers))
        .ok_or_else(|| UserError::Unauthorized("No refresh token provided".to_string()))?;

    let access = service.refresh(&token).await?;
    Ok(Json(AccessTokenResponse { access }))
}

/// The signed-in account
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, response = UnauthorizedResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn me<R: UserRepository>(
    State(service): State<SharedService<R>>,
    user: AuthUser,
) -> UserResult<Json<UserResponse>> {
    Ok(Json(service.get_user(user.id).await?))
}

/// Mail a password reset link
#[utoipa::path(
    post,
    path = "/auth/password-reset",
    tag = "auth",
    request_body = PasswordResetRequest,
    responses(
        (status = 201, description = "Reset link sent", body = MessageResponse),
        (status = 400, response = BadRequestValidationResponse)
    )
)]
async fn request_password_reset<R: UserRepository>(
    State(service): State<SharedService<R>>,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<PasswordResetRequest>,
) -> UserResult<impl IntoResponse> {
    let email = input.email.trim().to_string();
    service.request_password_reset(input).await?;

    AuditEvent::new(
        None,
        "user.password_reset_request",
        Some(format!("email:{}", email)),
        AuditOutcome::Success,
    )
    .with_request(&headers)
    .log();

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Password reset link sent to your email")),
    ))
}

/// Set a new password from an emailed reset link
#[utoipa::path(
    post,
    path = "/auth/password-reset/{uid}/{token}",
    tag = "auth",
    params(
        ("uid" = String, Path, description = "Encoded user ID"),
        ("token" = String, Path, description = "Reset token")
    ),
    request_body = PasswordResetConfirm,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, response = BadRequestValidationResponse)
    )
)]
async fn confirm_password_reset<R: UserRepository>(
    State(service): State<SharedService<R>>,
    headers: HeaderMap,
    Path((uid, token)): Path<(String, String)>,
    ValidatedJson(input): ValidatedJson<PasswordResetConfirm>,
) -> UserResult<Json<MessageResponse>> {
    let user = service.confirm_password_reset(&uid, &token, input).await?;

    AuditEvent::new(
        Some(user.id.to_string()),
        "user.password_reset",
        None,
        AuditOutcome::Success,
    )
    .with_request(&headers)
    .log();

    Ok(Json(MessageResponse::new(
        "Password reset successful. You can now login with your new password.",
    )))
}

/// Public profile with favorites, read list, comments and ratings
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User profile", body = UserProfile),
        (status = 400, response = BadRequestUuidResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn get_profile<R: UserRepository>(
    State(service): State<SharedService<R>>,
    _user: AuthUser,
    UuidPath(id): UuidPath,
) -> UserResult<Json<UserProfile>> {
    Ok(Json(service.profile(id).await?))
}

#[utoipa::path(
    put,
    path = "/users/me/password",
    tag = "users",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn change_password<R: UserRepository>(
    State(service): State<SharedService<R>>,
    user: AuthUser,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<ChangePasswordRequest>,
) -> UserResult<Json<MessageResponse>> {
    service.change_password(user.id, input).await?;

    AuditEvent::new(
        Some(user.id.to_string()),
        "user.password_change",
        None,
        AuditOutcome::Success,
    )
    .with_request(&headers)
    .log();

    Ok(Json(MessageResponse::new("Password changed successfully")))
}

/// Delete the caller's account, its interactions and its session
#[utoipa::path(
    delete,
    path = "/users/me",
    tag = "users",
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, response = UnauthorizedResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn delete_me<R: UserRepository>(
    State(service): State<SharedService<R>>,
    user: AuthUser,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    service.delete_user(user.id).await?;

    let tokens: Vec<String> = [extract_token_from_request(&headers), refresh_from_cookie(&headers)]
        .into_iter()
        .flatten()
        .collect();
    service.logout(&tokens).await;

    AuditEvent::new(
        Some(user.id.to_string()),
        "user.delete",
        Some(format!("user:{}", user.id)),
        AuditOutcome::Success,
    )
    .with_request(&headers)
    .log();

    let cookies = clear_session_cookies(service.config().secure_cookies)?;
    Ok(with_cookies(StatusCode::NO_CONTENT.into_response(), cookies))
}

#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "users-admin",
    params(UserFilter),
    responses(
        (status = 200, description = "Matching accounts, newest first", body = Vec<UserResponse>),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_list_users<R: UserRepository>(
    State(service): State<SharedService<R>>,
    _admin: AdminUser,
    Query(filter): Query<UserFilter>,
) -> UserResult<Json<Vec<UserResponse>>> {
    Ok(Json(service.list_users(filter).await?))
}

#[utoipa::path(
    get,
    path = "/admin/users/{id}",
    tag = "users-admin",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account", body = UserResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_get_user<R: UserRepository>(
    State(service): State<SharedService<R>>,
    _admin: AdminUser,
    UuidPath(id): UuidPath,
) -> UserResult<Json<UserResponse>> {
    Ok(Json(service.get_user(id).await?))
}

#[utoipa::path(
    put,
    path = "/admin/users/{id}",
    tag = "users-admin",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = AdminUserUpdate,
    responses(
        (status = 200, description = "Account updated", body = UserResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_update_user<R: UserRepository>(
    State(service): State<SharedService<R>>,
    admin: AdminUser,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<AdminUserUpdate>,
) -> UserResult<Json<UserResponse>> {
    let changes = serde_json::to_value(&input).unwrap_or_default();
    let user = service.update_user(id, input).await?;

    AuditEvent::new(
        Some(admin.0.id.to_string()),
        "user.admin_update",
        Some(format!("user:{}", id)),
        AuditOutcome::Success,
    )
    .with_request(&headers)
    .with_details(changes)
    .log();

    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    tag = "users-admin",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_delete_user<R: UserRepository>(
    State(service): State<SharedService<R>>,
    admin: AdminUser,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> UserResult<StatusCode> {
    service.delete_user(id).await?;

    AuditEvent::new(
        Some(admin.0.id.to_string()),
        "user.admin_delete",
        Some(format!("user:{}", id)),
        AuditOutcome::Success,
    )
    .with_request(&headers)
    .log();

    Ok(StatusCode::NO_CONTENT)
}
