//! Authentication Models
//! Mission: Define account, claims, and token data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub role: Role,
    /// Capability flag gating room/table management, separate from the role.
    pub room_permission: bool,
    /// Faculty scope attribute; restricts which rooms this user may reserve in.
    pub faculty: String,
    pub register_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
    pub last_login_date: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Room and table management requires the admin role AND the explicit
    /// capability flag.
    pub fn can_manage_rooms(&self) -> bool {
        self.role == Role::Admin && self.room_permission
    }
}

/// Closed set of account roles
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "visitor")]
    Visitor,
    #[serde(rename = "user")]
    User,
    #[serde(rename = "admin")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Visitor => "visitor",
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "visitor" => Some(Role::Visitor),
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Token kinds issued by the handler; refresh tokens are only accepted by
/// the refresh endpoint, access tokens everywhere else.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT Claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // subject (account id)
    pub iat: i64,    // issued-at timestamp
    pub exp: i64,    // expiration timestamp
    pub kind: TokenKind,
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// Registration request body
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub faculty: String,
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Refresh request body
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    /// Current password, re-verified before any profile change.
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Token pair issued at login and on refresh
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64, // seconds until the access token expires
    pub expires_at: DateTime<Utc>,
    pub issued_at: DateTime<Utc>,
    pub scope: String,
    pub user_id: i64,
}

/// User response (sanitized)
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub room_permission: bool,
    pub faculty: String,
    pub register_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
    pub last_login_date: Option<DateTime<Utc>>,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            room_permission: user.room_permission,
            faculty: user.faculty.clone(),
            register_date: user.register_date,
            updated_date: user.updated_date,
            last_login_date: user.last_login_date,
        }
    }
}
