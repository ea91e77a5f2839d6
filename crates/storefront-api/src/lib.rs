//! Storefront API - REST server
//!
//! Provides HTTP endpoints for registration, login, token status and
//! logout, the product catalogue, and per-user product lists.

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::{http::HeaderValue, routing::get, Router};
use storefront_core::config::ServerConfig;
#[cfg(any(test, feature = "test-utils"))]
use storefront_core::{
    config::{AppConfig, PasswordConfig},
    Stores,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server);

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http());

    match cors {
        Some(cors) => app.layer(cors),
        None => app,
    }
}

fn cors_layer(server: &ServerConfig) -> Option<CorsLayer> {
    if !server.cors_enabled {
        return None;
    }

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if server.cors_origins.is_empty() {
        return Some(layer.allow_origin(Any));
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    Some(layer.allow_origin(origins))
}

/// In-memory state with cheap password hashing, for tests
#[cfg(any(test, feature = "test-utils"))]
pub fn test_state() -> AppState {
    let mut config = AppConfig::default();
    config.auth.password = PasswordConfig {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
    };
    AppState::new(config, Stores::in_memory())
}

/// Router over [`test_state`]
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    create_router(Arc::new(test_state()))
}
