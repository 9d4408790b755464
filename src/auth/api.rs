//! Authentication API Endpoints
//! Mission: Provide registration, login, refresh, and account endpoints

use crate::api::routes::AppState;
use crate::auth::middleware::CurrentUser;
use crate::auth::models::{
    ChangePasswordRequest, LoginRequest, RefreshRequest, RegisterRequest, Role, TokenKind,
    TokenResponse, UpdateUserRequest, UserResponse,
};
use crate::auth::user_store::NewUser;
use crate::errors::ApiError;
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use tracing::{info, warn};

/// Register a regular user - POST /api/users/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    create_account(&state, payload, Role::User, false)
}

/// Register an admin account - POST /api/users/register_admin
///
/// Bootstrap path mirroring the default-admin seeding; admins are created
/// with the room-management capability flag set.
pub async fn register_admin(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    create_account(&state, payload, Role::Admin, true)
}

fn create_account(
    state: &AppState,
    payload: RegisterRequest,
    role: Role,
    room_permission: bool,
) -> Result<Json<UserResponse>, ApiError> {
    if payload.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    if state.users.get_user_by_email(&payload.email)?.is_some() {
        return Err(ApiError::Conflict(
            "An account with this email already exists.".to_string(),
        ));
    }
    if state
        .users
        .get_user_by_username(&payload.username)?
        .is_some()
    {
        return Err(ApiError::Conflict(
            "An account with this username already exists.".to_string(),
        ));
    }

    let user = state.users.create_user(NewUser {
        username: &payload.username,
        email: &payload.email,
        password: &payload.password,
        first_name: &payload.first_name,
        last_name: &payload.last_name,
        faculty: &payload.faculty,
        role,
        room_permission,
    })?;

    Ok(Json(UserResponse::from_user(&user)))
}

/// Login endpoint - POST /api/auth/login
///
/// Issues the access + refresh token pair. A wrong password and an
/// unknown email produce the same 401 as a bad token.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .users
        .verify_password(&payload.email, &payload.password)?
        .ok_or_else(|| {
            warn!("❌ Failed login attempt: {}", payload.email);
            ApiError::Unauthenticated
        })?;

    let tokens = state.jwt.issue_pair(user.id)?;
    state.users.record_login(user.id)?;

    info!("✅ Login successful: {} ({})", user.username, user.role.as_str());
    Ok(Json(tokens))
}

/// Exchange a refresh token for a new pair - POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let claims = state
        .jwt
        .validate_kind(&payload.refresh_token, TokenKind::Refresh)
        .map_err(|_| ApiError::Unauthenticated)?;

    let user_id = claims.user_id().ok_or(ApiError::Unauthenticated)?;

    // The account must still exist; deletion invalidates refresh tokens too
    let user = state
        .users
        .get_user(user_id)?
        .ok_or(ApiError::Unauthenticated)?;

    let tokens = state.jwt.issue_pair(user.id)?;
    Ok(Json(tokens))
}

/// Current account info - GET /api/auth/me
pub async fn me(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<UserResponse> {
    Json(UserResponse::from_user(&user))
}

/// Fetch an account by id - GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Extension(_current): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .users
        .get_user(user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from_user(&user)))
}

/// Change the caller's password - PUT /api/users/change_password
///
/// The current password is re-verified; a mismatch is a 401 with the
/// generic message.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if payload.new_password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    state
        .users
        .verify_password(&user.email, &payload.current_password)?
        .ok_or(ApiError::Unauthenticated)?;

    state.users.change_password(user.id, &payload.new_password)?;

    // Re-fetch so the response carries the post-update timestamps
    let updated = state
        .users
        .get_user(user.id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    info!("🔑 Password changed: {}", user.username);
    Ok(Json(UserResponse::from_user(&updated)))
}

/// Update the caller's profile - PUT /api/users/update
pub async fn update_user(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    state
        .users
        .verify_password(&user.email, &payload.password)?
        .ok_or(ApiError::Unauthenticated)?;

    // A new email must not collide with another account
    if let Some(existing) = state.users.get_user_by_email(&payload.email)? {
        if existing.id != user.id {
            return Err(ApiError::Conflict(
                "An account with this email already exists.".to_string(),
            ));
        }
    }

    let updated = state
        .users
        .update_profile(user.id, &payload.email, &payload.first_name, &payload.last_name)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from_user(&updated)))
}
