//! Storefront API Server
//!
//! REST API server for the storefront backend.
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;

use anyhow::Context;
use storefront_api::{create_router, state::AppState};
use storefront_core::config::{AppConfig, LoggingConfig, StorageBackend};
use storefront_core::{PgStore, Stores};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match std::env::var("STOREFRONT_CONFIG") {
        Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };

    init_tracing(&config.logging);
    config.validate()?;

    if config.auth.uses_dev_secret() {
        tracing::warn!("SECRET_KEY is not set; using the development signing key");
    }

    let stores = open_stores(&config).await?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state
    let state = Arc::new(AppState::new(config, stores));

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Storefront API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Filter used when `RUST_LOG` is unset
///
/// Every target we emit is named; anything unlisted is dropped.
fn default_log_filter(level: &str) -> String {
    format!("storefront_api={level},storefront_core={level},audit=info,tower_http=debug")
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter(&logging.level)));

    if logging.json_format {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn open_stores(config: &AppConfig) -> anyhow::Result<Stores> {
    match config.database.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok(Stores::in_memory())
        }
        StorageBackend::Postgres => {
            let store = PgStore::connect(&config.database)
                .await
                .context("failed to connect to PostgreSQL")?;
            if config.database.auto_migrate {
                store.create_schema().await?;
                tracing::info!("Database schema ready");
            }
            Ok(Stores::from_backend(Arc::new(store)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_default_filter_passes_audit_and_core_events() {
        let subscriber =
            tracing_subscriber::registry().with(EnvFilter::new(default_log_filter("info")));

        tracing::subscriber::with_default(subscriber, || {
            assert!(tracing::enabled!(target: "audit", Level::INFO));
            assert!(tracing::enabled!(target: "storefront_core::postgres", Level::INFO));
            assert!(tracing::enabled!(target: "storefront_api::handlers", Level::INFO));
            assert!(!tracing::enabled!(target: "storefront_core::postgres", Level::DEBUG));
            assert!(!tracing::enabled!(target: "sqlx::query", Level::INFO));
        });
    }
}
