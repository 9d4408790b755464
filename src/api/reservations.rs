//! Reservation Endpoints
//! Mission: Reserve tables for time windows under scope and ownership rules

use crate::api::routes::AppState;
use crate::api::PageQuery;
use crate::auth::guard::{self, ReservationAction};
use crate::auth::middleware::CurrentUser;
use crate::errors::ApiError;
use crate::store::models::{
    CreateReservation, Reservation, ReservationList, Room, UpdateReservation,
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{Duration, Utc};
use serde_json::json;

/// Create a reservation - POST /api/reservations
///
/// The acting account owns the reservation. Checks run in order: table
/// and room existence, room open flag, faculty scope, window overlap.
pub async fn create_reservation(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<CreateReservation>,
) -> Result<Json<Reservation>, ApiError> {
    if payload.duration_hours < 1 {
        return Err(ApiError::BadRequest(
            "duration_hours must be at least 1".to_string(),
        ));
    }

    let room = room_of_table(&state, payload.table_id)?;
    guard::ensure_reservable(&user, &room)?;

    // The store re-checks the window atomically with the insert
    let start_time = Utc::now();
    let end_time = start_time + Duration::hours(payload.duration_hours);
    let reservation = state
        .resources
        .create_reservation(
            user.id,
            payload.table_id,
            payload.duration_hours,
            start_time,
            end_time,
        )?
        .ok_or_else(|| {
            ApiError::Conflict(
                "This table is already reserved for the selected time window".to_string(),
            )
        })?;

    Ok(Json(reservation))
}

/// List reservations - GET /api/reservations?page=N
pub async fn list_reservations(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ReservationList>, ApiError> {
    Ok(Json(state.resources.list_reservations(query.page())?))
}

/// Fetch a reservation - GET /api/reservations/:id
pub async fn get_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<i64>,
) -> Result<Json<Reservation>, ApiError> {
    let reservation = state
        .resources
        .get_reservation(reservation_id)?
        .ok_or_else(|| ApiError::NotFound("Reservation not found".to_string()))?;
    Ok(Json(reservation))
}

/// Update a reservation - PUT /api/reservations/:id (owner or admin)
pub async fn update_reservation(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(reservation_id): Path<i64>,
    Json(payload): Json<UpdateReservation>,
) -> Result<Json<Reservation>, ApiError> {
    if payload.duration_hours < 1 {
        return Err(ApiError::BadRequest(
            "duration_hours must be at least 1".to_string(),
        ));
    }

    let reservation = state
        .resources
        .get_reservation(reservation_id)?
        .ok_or_else(|| ApiError::NotFound("Reservation not found".to_string()))?;
    guard::ensure_reservation_owner(&user, &reservation, ReservationAction::Update)?;

    // Moving to another table re-applies the room policies
    if payload.table_id != reservation.table_id {
        let room = room_of_table(&state, payload.table_id)?;
        guard::ensure_reservable(&user, &room)?;
    }

    let updated = state
        .resources
        .update_reservation(reservation_id, payload.table_id, payload.duration_hours)?
        .ok_or_else(|| ApiError::NotFound("Reservation not found".to_string()))?;

    Ok(Json(updated))
}

/// Delete a reservation - DELETE /api/reservations/:id (owner or admin)
pub async fn delete_reservation(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(reservation_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let reservation = state
        .resources
        .get_reservation(reservation_id)?
        .ok_or_else(|| ApiError::NotFound("Reservation not found".to_string()))?;
    guard::ensure_reservation_owner(&user, &reservation, ReservationAction::Delete)?;

    state.resources.delete_reservation(reservation_id)?;

    Ok(Json(json!({ "message": "Reservation deleted" })))
}

/// Resolve a table's parent room, with 404s for either missing link.
fn room_of_table(state: &AppState, table_id: i64) -> Result<Room, ApiError> {
    let table = state
        .resources
        .get_table(table_id)?
        .ok_or_else(|| ApiError::NotFound("Table not found".to_string()))?;

    state
        .resources
        .get_room(table.room_id)?
        .ok_or_else(|| ApiError::NotFound("Room not found".to_string()))
}
