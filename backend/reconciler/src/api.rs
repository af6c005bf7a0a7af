//! Axum operational endpoints.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::db;
use crate::errors::Result;

#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub last_processed_block: u64,
    pub lease_holder: Option<String>,
    pub properties: i64,
    pub offers: i64,
    pub transactions: i64,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /status`
///
/// Reconciler position and mirror-store row counts.
pub async fn status(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    match build_status(&state.pool).await {
        Ok(body) => (StatusCode::OK, Json(serde_json::json!(body))).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!(ErrorResponse {
                error: e.to_string()
            })),
        )
            .into_response(),
    }
}

async fn build_status(pool: &SqlitePool) -> Result<StatusResponse> {
    let mut conn = pool.acquire().await?;
    Ok(StatusResponse {
        last_processed_block: db::last_processed_block(&mut conn).await?,
        lease_holder: db::lease_holder(&mut conn).await?,
        properties: db::table_count(&mut conn, "properties").await?,
        offers: db::table_count(&mut conn, "offers").await?,
        transactions: db::table_count(&mut conn, "transactions").await?,
    })
}
