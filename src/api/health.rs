//! Health check endpoints

use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize, Deserialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: ReadyChecks,
}

#[derive(Serialize, Deserialize)]
pub struct ReadyChecks {
    pub database: String,
    pub cache: String,
}

fn check_label(ok: bool) -> String {
    if ok { "ok" } else { "unavailable" }.to_string()
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check endpoint. Only the store gates readiness: the live cache
/// is a lossy projection every read path degrades around, so its state is
/// reported but never turns the probe red.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = sqlx::query("SELECT 1")
        .execute(&state.db_pool)
        .await
        .is_ok();
    let cache_ok = state.cache.ping().await.is_ok();

    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            status: if db_ok { "ready" } else { "not_ready" }.to_string(),
            checks: ReadyChecks {
                database: check_label(db_ok),
                cache: check_label(cache_ok),
            },
        }),
    )
}
