//! Room Endpoints
//! Mission: CRUD for rooms, gated by role and ownership policies

use crate::api::routes::AppState;
use crate::api::PageQuery;
use crate::auth::guard;
use crate::auth::middleware::CurrentUser;
use crate::errors::ApiError;
use crate::store::models::{CreateRoom, Room, RoomList, UpdateRoom};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde_json::json;

/// Create a room - POST /api/rooms (admin + room permission)
pub async fn create_room(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<CreateRoom>,
) -> Result<Json<Room>, ApiError> {
    guard::ensure_room_manager(&user)?;

    let room = state.resources.create_room(
        &payload.name,
        &payload.faculty,
        payload.is_open,
        user.id,
    )?;

    Ok(Json(room))
}

/// List rooms - GET /api/rooms?page=N
pub async fn list_rooms(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<RoomList>, ApiError> {
    Ok(Json(state.resources.list_rooms(query.page())?))
}

/// Fetch a room - GET /api/rooms/:id
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
) -> Result<Json<Room>, ApiError> {
    let room = state
        .resources
        .get_room(room_id)?
        .ok_or_else(|| ApiError::NotFound("Room not found".to_string()))?;
    Ok(Json(room))
}

/// Update a room - PUT /api/rooms/:id (admin + permission + owner)
pub async fn update_room(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(room_id): Path<i64>,
    Json(payload): Json<UpdateRoom>,
) -> Result<Json<Room>, ApiError> {
    guard::ensure_room_manager(&user)?;

    let room = state
        .resources
        .get_room(room_id)?
        .ok_or_else(|| ApiError::NotFound("Room not found".to_string()))?;
    guard::ensure_room_owner(&user, &room)?;

    let updated = state
        .resources
        .update_room(room_id, &payload.name, &payload.faculty, payload.is_open)?
        .ok_or_else(|| ApiError::NotFound("Room not found".to_string()))?;

    Ok(Json(updated))
}

/// Delete a room - DELETE /api/rooms/:id (admin + permission + owner)
pub async fn delete_room(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(room_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    guard::ensure_room_manager(&user)?;

    let room = state
        .resources
        .get_room(room_id)?
        .ok_or_else(|| ApiError::NotFound("Room not found".to_string()))?;
    guard::ensure_room_owner(&user, &room)?;

    state.resources.delete_room(room_id)?;

    Ok(Json(json!({ "message": "Room deleted" })))
}
