//! # Health Check
//!
//! `GET /api/health` probes storage with a trivial query under the storage
//! deadline. Not scoped: load balancers call it without session headers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrations_applied: Option<usize>,
    pub version: &'static str,
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    if !state.db.health_check().await {
        warn!("Health check failed: database unreachable");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unavailable",
                database: "unreachable",
                migrations_applied: None,
                version: env!("CARGO_PKG_VERSION"),
            }),
        );
    }

    let migrations_applied = state.db.migration_status().await.ok().map(|(_, applied)| applied);

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            database: "ok",
            migrations_applied,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
