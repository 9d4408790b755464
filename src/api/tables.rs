//! Table Endpoints
//! Mission: Batch table allocation and reads, gated by the role policy

use crate::api::routes::AppState;
use crate::api::PageQuery;
use crate::auth::guard;
use crate::auth::middleware::CurrentUser;
use crate::errors::ApiError;
use crate::store::models::{CreateTables, Table, TableList};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde_json::json;

/// Allocate tables in a room - POST /api/tables (admin + room permission)
///
/// Creates `count` tables numbered sequentially after the room's current
/// maximum.
pub async fn create_tables(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<CreateTables>,
) -> Result<Json<Vec<Table>>, ApiError> {
    guard::ensure_room_manager(&user)?;

    if payload.count < 1 {
        return Err(ApiError::BadRequest(
            "count must be at least 1".to_string(),
        ));
    }

    state
        .resources
        .get_room(payload.room_id)?
        .ok_or_else(|| ApiError::NotFound("Room not found".to_string()))?;

    let tables =
        state
            .resources
            .create_tables(payload.room_id, payload.count, payload.is_available)?;

    Ok(Json(tables))
}

/// List tables - GET /api/tables?page=N
pub async fn list_tables(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<TableList>, ApiError> {
    Ok(Json(state.resources.list_tables(query.page())?))
}

/// Fetch a table - GET /api/tables/:id
pub async fn get_table(
    State(state): State<AppState>,
    Path(table_id): Path<i64>,
) -> Result<Json<Table>, ApiError> {
    let table = state
        .resources
        .get_table(table_id)?
        .ok_or_else(|| ApiError::NotFound("Table not found".to_string()))?;
    Ok(Json(table))
}

/// Delete a table - DELETE /api/tables/:id (admin + room permission)
pub async fn delete_table(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(table_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    guard::ensure_room_manager(&user)?;

    if !state.resources.delete_table(table_id)? {
        return Err(ApiError::NotFound("Table not found".to_string()));
    }

    Ok(Json(json!({ "message": "Table deleted" })))
}
