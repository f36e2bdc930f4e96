use axum_helpers::{JwtAuth, TokenPair, TokenSubject, TokenType};
use domain_interactions::{UserActivity, UserLibrary};
use std::sync::Arc;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::attempts::{InMemoryLoginAttemptStore, LoginAttemptStore};
use crate::config::AccountsConfig;
use crate::error::{UserError, UserResult};
use crate::mailer::{LogMailer, MailMessage, Mailer};
use crate::models::{
    AdminUserUpdate, ChangePasswordRequest, LoginRequest, MAX_USERNAME_LENGTH,
    PasswordResetConfirm, PasswordResetRequest, SignupRequest, User, UserFilter, UserProfile,
    UserResponse,
};
use crate::password::{hash_password, validate_password, verify_password};
use crate::repository::UserRepository;
use crate::tokens::{AccountTokenGenerator, decode_uid, encode_uid};

/// Signup, verification, login throttling, password reset and account admin
#[derive(Clone)]
pub struct AccountService<R: UserRepository> {
    repository: Arc<R>,
    auth: JwtAuth,
    mailer: Arc<dyn Mailer>,
    attempts: Arc<dyn LoginAttemptStore>,
    activity: Option<Arc<dyn UserActivity>>,
    tokens: AccountTokenGenerator,
    config: AccountsConfig,
}

impl<R: UserRepository> AccountService<R> {
    /// Account tokens are signed with the JWT secret. Mail goes to the log and
    /// login attempts are counted in memory until replaced.
    pub fn new(repository: R, auth: JwtAuth, config: AccountsConfig) -> Self {
        let tokens = AccountTokenGenerator::new(auth.secret(), config.token_ttl_secs);
        Self {
            repository: Arc::new(repository),
            auth,
            mailer: Arc::new(LogMailer),
            attempts: Arc::new(InMemoryLoginAttemptStore::new()),
            activity: None,
            tokens,
            config,
        }
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn with_attempt_store(mut self, attempts: Arc<dyn LoginAttemptStore>) -> Self {
        self.attempts = attempts;
        self
    }

    /// Source of profile libraries, also told to forget deleted accounts
    pub fn with_activity(mut self, activity: Arc<dyn UserActivity>) -> Self {
        self.activity = Some(activity);
        self
    }

    pub fn config(&self) -> &AccountsConfig {
        &self.config
    }

    pub fn auth(&self) -> &JwtAuth {
        &self.auth
    }

    /// Create an inactive account and mail its verification link
    pub async fn signup(&self, input: SignupRequest) -> UserResult<User> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_string();
        let password = input.password;

        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(UserError::Validation("All fields are required".to_string()));
        }
        if !email.validate_email() {
            return Err(UserError::Validation("Invalid email format".to_string()));
        }
        if username.chars().count() > MAX_USERNAME_LENGTH {
            return Err(UserError::Validation("Username is too long".to_string()));
        }
        validate_password(&password, Some(&username))?;

        if self.repository.email_exists(&email).await? {
            return Err(UserError::DuplicateEmail(email));
        }
        if self.repository.username_exists(&username).await? {
            return Err(UserError::DuplicateUsername(username));
        }

        let password_hash = hash_password(&password)?;
        let user = self
            .repository
            .create(User::new(username, email, password_hash))
            .await?;

        let link = self
            .config
            .verification_link(&encode_uid(user.id), &self.tokens.make_token(&user));
        self.mailer
            .send(MailMessage::verification(&self.config.from_email, &user.email, &link))
            .await?;

        tracing::info!(user_id = %user.id, "Signed up, verification mail sent");
        Ok(user)
    }

    /// Activate the account behind an emailed link and open a session
    pub async fn verify_email(&self, uid: &str, token: &str) -> UserResult<(User, TokenPair)> {
        let id = decode_uid(uid).ok_or(UserError::MalformedLink("Invalid verification link"))?;
        let mut user = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(UserError::LinkUserNotFound)?;

        if user.is_active {
            return Err(UserError::AlreadyVerified);
        }
        if !self.tokens.check_token(&user, token) {
            return Err(UserError::InvalidVerificationToken);
        }

        user.is_active = true;
        user.updated_at = chrono::Utc::now();
        let user = self.repository.update(user).await?;
        let tokens = self.issue_session(&user).await?;

        tracing::info!(user_id = %user.id, "Email verified");
        Ok((user, tokens))
    }

    /// Check credentials under the failed-attempt lockout
    pub async fn login(&self, input: LoginRequest) -> UserResult<(User, TokenPair)> {
        let email = input.email.trim();
        if email.is_empty() || input.password.is_empty() {
            return Err(UserError::Validation(
                "Both email and password are required".to_string(),
            ));
        }

        let attempts = self.attempts.attempts(email).await?;
        if attempts >= self.config.max_login_attempts {
            tracing::warn!(attempts, "Login locked out");
            return Err(UserError::TooManyAttempts {
                wait: self.config.lockout_wait(),
            });
        }

        let Some(user) = self.repository.get_by_email(email).await? else {
            self.attempts
                .record_failure(email, self.config.lockout_secs)
                .await?;
            return Err(UserError::InvalidCredentials);
        };

        if !user.is_active {
            return Err(UserError::NotVerified);
        }

        if !verify_password(&input.password, &user.password_hash)? {
            let count = self
                .attempts
                .record_failure(email, self.config.lockout_secs)
                .await?;
            tracing::debug!(user_id = %user.id, attempts = count, "Wrong password");
            return Err(UserError::InvalidCredentials);
        }

        self.attempts.clear(email).await?;
        let tokens = self.issue_session(&user).await?;
        Ok((user, tokens))
    }

    /// New access token for a live refresh token of an active account
    pub async fn refresh(&self, refresh_token: &str) -> UserResult<String> {
        let claims = self
            .auth
            .authenticate(refresh_token, TokenType::Refresh)
            .await
            .map_err(|e| UserError::Unauthorized(e.to_string()))?;

        let user = match Uuid::parse_str(&claims.sub) {
            Ok(id) => self.repository.get_by_id(id).await?,
            Err(_) => None,
        }
        .filter(|u| u.is_active)
        .ok_or_else(|| UserError::Unauthorized("User not found or inactive".to_string()))?;

        self.auth
            .issue_token(&subject(&user), TokenType::Access)
            .await
            .map_err(|e| UserError::Token(e.to_string()))
    }

    /// Revoke and blacklist every presented token
    pub async fn logout(&self, tokens: &[String]) {
        for token in tokens {
            self.auth.revoke_raw(token).await;
        }
    }

    pub async fn get_user(&self, id: Uuid) -> UserResult<UserResponse> {
        Ok(self.find(id).await?.into())
    }

    /// Mail a password reset link to an active account
    pub async fn request_password_reset(&self, input: PasswordResetRequest) -> UserResult<()> {
        let email = input.email.trim();
        if email.is_empty() {
            return Err(UserError::Validation("Email is required".to_string()));
        }

        let user = self
            .repository
            .get_by_email(email)
            .await?
            .ok_or(UserError::UnknownEmail)?;
        if !user.is_active {
            return Err(UserError::AccountInactive);
        }

        let link = self
            .config
            .reset_link(&encode_uid(user.id), &self.tokens.make_token(&user));
        self.mailer
            .send(MailMessage::password_reset(&self.config.from_email, &user.email, &link))
            .await?;

        tracing::info!(user_id = %user.id, "Password reset mail sent");
        Ok(())
    }

    /// Set a new password through an emailed reset link
    pub async fn confirm_password_reset(
        &self,
        uid: &str,
        token: &str,
        input: PasswordResetConfirm,
    ) -> UserResult<User> {
        let new_password = input.new_password;
        if new_password.is_empty() {
            return Err(UserError::Validation("New password is required".to_string()));
        }

        let id = decode_uid(uid).ok_or(UserError::MalformedLink("Invalid reset link format"))?;
        let mut user = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(UserError::LinkUserNotFound)?;

        if !self.tokens.check_token(&user, token) {
            return Err(UserError::InvalidResetToken);
        }
        if !user.is_active {
            return Err(UserError::AccountInactive);
        }
        validate_password(&new_password, Some(&user.username))?;
        if verify_password(&new_password, &user.password_hash)? {
            return Err(UserError::PasswordUnchanged);
        }

        user.password_hash = hash_password(&new_password)?;
        user.updated_at = chrono::Utc::now();
        let user = self.repository.update(user).await?;

        self.mailer
            .send(MailMessage::password_reset_done(&self.config.from_email, &user.email))
            .await?;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(user)
    }

    pub async fn change_password(&self, user_id: Uuid, input: ChangePasswordRequest) -> UserResult<()> {
        if input.current_password.is_empty() || input.new_password.is_empty() {
            return Err(UserError::Validation(
                "Both current and new password are required".to_string(),
            ));
        }

        let mut user = self.find(user_id).await?;
        if !verify_password(&input.current_password, &user.password_hash)? {
            return Err(UserError::WrongPassword);
        }
        validate_password(&input.new_password, Some(&user.username))?;
        if input.new_password == input.current_password {
            return Err(UserError::PasswordUnchanged);
        }

        user.password_hash = hash_password(&input.new_password)?;
        user.updated_at = chrono::Utc::now();
        self.repository.update(user).await?;

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Account data plus favorites, read list, comments and ratings
    pub async fn profile(&self, id: Uuid) -> UserResult<UserProfile> {
        let user = self.find(id).await?;
        let library = match &self.activity {
            Some(activity) => activity.library(user.id).await?,
            None => UserLibrary::default(),
        };

        Ok(UserProfile {
            id: user.id,
            username: user.username,
            email: user.email,
            date_joined: user.date_joined,
            library,
        })
    }

    /// Remove the account and everything it did with the catalog
    pub async fn delete_user(&self, id: Uuid) -> UserResult<()> {
        self.find(id).await?;

        if let Some(activity) = &self.activity {
            let removed = activity.forget_user(id).await?;
            tracing::debug!(user_id = %id, removed, "Removed user interactions");
        }
        if !self.repository.delete(id).await? {
            return Err(UserError::NotFound(id));
        }

        tracing::info!(user_id = %id, "Deleted account");
        Ok(())
    }

    pub async fn list_users(&self, filter: UserFilter) -> UserResult<Vec<UserResponse>> {
        let users = self.repository.list(filter).await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    pub async fn update_user(&self, id: Uuid, mut input: AdminUserUpdate) -> UserResult<UserResponse> {
        let mut user = self.find(id).await?;

        input.username = input.username.map(|u| u.trim().to_string());
        input.email = input.email.map(|e| e.trim().to_string());
        if input.username.as_deref().is_some_and(str::is_empty) {
            return Err(UserError::Validation("Username cannot be empty".to_string()));
        }

        user.apply_update(input);
        let updated = self.repository.update(user).await?;

        tracing::info!(user_id = %id, "Account updated by admin");
        Ok(updated.into())
    }

    async fn find(&self, id: Uuid) -> UserResult<User> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    async fn issue_session(&self, user: &User) -> UserResult<TokenPair> {
        self.auth
            .issue_token_pair(&subject(user))
            .await
            .map_err(|e| UserError::Token(e.to_string()))
    }
}

fn subject(user: &User) -> TokenSubject {
    TokenSubject {
        user_id: user.id.to_string(),
        email: user.email.clone(),
        name: user.username.clone(),
        roles: user.role_names(),
    }
}
