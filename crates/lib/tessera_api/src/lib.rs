//! # tessera_api
//!
//! HTTP API library for Tessera: the axum router, handlers, middleware,
//! and the services wiring the token subsystem to requests.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod request_info;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};

use tessera_core::auth::tokens::TokenCodec;

use crate::config::ApiConfig;
use crate::handlers::auth;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool.
    pub pool: PgPool,
    /// API configuration.
    pub config: ApiConfig,
    /// Process-wide token codec (immutable after startup).
    pub codec: Arc<TokenCodec>,
}

/// Run embedded database migrations.
///
/// Delegates to `tessera_core::migrate::migrate()` which owns the
/// migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    tessera_core::migrate::migrate(pool).await
}

/// Builds the axum router with all routes and shared state.
///
/// The token authenticator runs on every route (anonymous requests pass
/// through); the breadcrumb layer sits outside it so rejected requests
/// still get a correlation id.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/identity", get(auth::identity_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ))
        .layer(axum::middleware::from_fn(
            middleware::breadcrumb::breadcrumb,
        ))
        .layer(cors)
        .with_state(state)
}
