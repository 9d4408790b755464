//! Router Assembly
//! Mission: Wire public and protected routes around shared state

use crate::api::{reservations, rooms, tables};
use crate::auth::{api as auth_api, auth_middleware, JwtHandler, UserStore};
use crate::middleware::request_logging;
use crate::store::ResourceStore;
use axum::{
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared application state, constructed once at startup and never
/// mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserStore>,
    pub resources: Arc<ResourceStore>,
    pub jwt: Arc<JwtHandler>,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    // Routes reachable without a token
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/users/register", post(auth_api::register))
        .route("/api/users/register_admin", post(auth_api::register_admin))
        .route("/api/auth/login", post(auth_api::login))
        .route("/api/auth/refresh", post(auth_api::refresh))
        .with_state(state.clone());

    // Everything else requires a valid access token
    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth_api::me))
        .route("/api/users/change_password", put(auth_api::change_password))
        .route("/api/users/update", put(auth_api::update_user))
        .route("/api/users/:id", get(auth_api::get_user))
        .route(
            "/api/rooms",
            post(rooms::create_room).get(rooms::list_rooms),
        )
        .route(
            "/api/rooms/:id",
            get(rooms::get_room)
                .put(rooms::update_room)
                .delete(rooms::delete_room),
        )
        .route(
            "/api/tables",
            post(tables::create_tables).get(tables::list_tables),
        )
        .route(
            "/api/tables/:id",
            get(tables::get_table).delete(tables::delete_table),
        )
        .route(
            "/api/reservations",
            post(reservations::create_reservation).get(reservations::list_reservations),
        )
        .route(
            "/api/reservations/:id",
            get(reservations::get_reservation)
                .put(reservations::update_reservation)
                .delete(reservations::delete_reservation),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
}

// ===== Route Handlers =====

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}
