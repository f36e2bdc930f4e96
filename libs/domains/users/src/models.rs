use chrono::{DateTime, Utc};
use domain_interactions::UserLibrary;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub const MAX_USERNAME_LENGTH: usize = 150;

/// Account holder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub roles: Vec<Role>,
    /// False until the email address is verified
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// New, not yet verified account
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            username,
            email,
            password_hash,
            roles: vec![Role::User],
            is_active: false,
            date_joined: now,
            updated_at: now,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.to_string()).collect()
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// Public view of a user, without credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            roles: user.roles,
            is_active: user.is_active,
            date_joined: user.date_joined,
        }
    }
}

/// Profile page: account data plus everything the user did with the catalog
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub date_joined: DateTime<Utc>,
    #[serde(flatten)]
    pub library: UserLibrary,
}

// Missing fields in the request bodies below read as empty strings; the
// service reports them with its own messages.

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub username: String,
    pub email: String,
    pub refresh: String,
    pub access: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyEmailResponse {
    pub message: String,
    pub tokens: axum_helpers::TokenPair,
}

/// Refresh token, read from the body or the `refresh_token` cookie
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessTokenResponse {
    pub access: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct PasswordResetRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct PasswordResetConfirm {
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// Admin edit of an account
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct AdminUserUpdate {
    #[validate(length(min = 1, max = 150))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub is_active: Option<bool>,
    #[validate(length(min = 1))]
    pub roles: Option<Vec<Role>>,
}

impl User {
    pub fn apply_update(&mut self, update: AdminUserUpdate) {
        if let Some(username) = update.username {
            self.username = username;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        if let Some(roles) = update.roles {
            self.roles = roles;
        }
        self.updated_at = Utc::now();
    }
}

/// Admin user listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserFilter {
    /// Case-insensitive match on username or email
    pub search: Option<String>,
    pub is_active: Option<bool>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> u64 {
    50
}

impl Default for UserFilter {
    fn default() -> Self {
        Self {
            search: None,
            is_active: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        if let Some(active) = self.is_active
            && user.is_active != active
        {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                user.username.to_lowercase().contains(&term)
                    || user.email.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        User::new(
            "Marguerite".to_string(),
            "marguerite@example.com".to_string(),
            "hash".to_string(),
        )
    }

    #[test]
    fn test_new_user_is_inactive_reader() {
        let user = sample();
        assert!(!user.is_active);
        assert_eq!(user.roles, vec![Role::User]);
        assert!(!user.has_role(Role::Admin));
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["roles"][0], "user");
    }

    #[test]
    fn test_role_parses_lowercase() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::User.to_string(), "user");
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_filter_matches_username_or_email() {
        let user = sample();
        let by_name = UserFilter {
            search: Some("margue".to_string()),
            ..Default::default()
        };
        let by_email = UserFilter {
            search: Some("EXAMPLE.COM".to_string()),
            ..Default::default()
        };
        let active_only = UserFilter {
            is_active: Some(true),
            ..Default::default()
        };
        assert!(by_name.matches(&user));
        assert!(by_email.matches(&user));
        assert!(!active_only.matches(&user));
    }

    #[test]
    fn test_apply_update_touches_given_fields() {
        let mut user = sample();
        user.apply_update(AdminUserUpdate {
            is_active: Some(true),
            roles: Some(vec![Role::User, Role::Admin]),
            ..Default::default()
        });
        assert!(user.is_active);
        assert!(user.has_role(Role::Admin));
        assert_eq!(user.username, "Marguerite");
    }
}
