//! Authentication Middleware
//! Mission: Protect API endpoints with JWT validation
//!
//! Validation is two-step: verify the token (signature, expiry, kind),
//! then resolve the embedded subject against the user store. The lookup
//! means a deleted account invalidates all of its outstanding tokens
//! immediately, with no revocation list.

use crate::api::routes::AppState;
use crate::auth::models::{TokenKind, User};
use crate::errors::ApiError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// The resolved account, inserted into request extensions for handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Auth middleware that validates bearer tokens and resolves the account.
///
/// Every failure mode (missing header, malformed token, bad signature,
/// expired, refresh-kind token, deleted account) maps to the same 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthenticated)?;

    let claims = state
        .jwt
        .validate_kind(token, TokenKind::Access)
        .map_err(|_| ApiError::Unauthenticated)?;

    let user_id = claims.user_id().ok_or(ApiError::Unauthenticated)?;

    let user = state
        .users
        .get_user(user_id)?
        .ok_or(ApiError::Unauthenticated)?;

    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}
