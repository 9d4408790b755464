//! Room/Table Reservation API Server
//! Mission: Authenticated CRUD for faculty rooms, tables, and reservations

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roomtable_backend::{
    api::routes::{create_router, AppState},
    auth::{JwtHandler, UserStore},
    config::Config,
    store::ResourceStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    init_tracing();

    let config = Config::from_env()?;

    let users = Arc::new(UserStore::new(&config.database_path)?);
    users.seed_default_admin()?;
    let resources = Arc::new(ResourceStore::new(&config.database_path)?);
    let jwt = Arc::new(JwtHandler::new(
        config.secret_key.clone(),
        config.access_token_expire_minutes,
        config.refresh_token_expire_minutes,
    ));

    let state = AppState {
        users,
        resources,
        jwt,
    };
    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("🎯 API server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomtable_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
