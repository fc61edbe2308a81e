//! Deppo server library logic.

pub mod config;

use axum::{http::StatusCode, routing::get, Extension, Json, Router};
use deppo_db::{QueryParams, SqlRepository};
use deppo_types::DataResult;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Repository used for database probes.
    pub probe: SqlRepository<i64>,
}

impl AppState {
    /// Builds the state from loaded configuration.
    pub fn from_config(config: &config::Config) -> Self {
        Self {
            probe: SqlRepository::new(config.db_settings())
                .with_procedures(config.procedure_catalog()),
        }
    }
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Database health handler.
///
/// Runs `SELECT 1` through the repository and returns its envelope.
async fn health_db(
    Extension(state): Extension<Arc<AppState>>,
) -> (StatusCode, Json<DataResult<i64>>) {
    let result = state.probe.get_by_id_async("SELECT 1", QueryParams::new()).await;
    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(result))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/db", get(health_db))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
