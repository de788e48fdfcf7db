use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::SqlitePool;

use crate::error::AppError;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Ready once the store answers a trivial query.
pub async fn ready(State(pool): State<SqlitePool>) -> impl IntoResponse {
    match sqlx::query_scalar::<_, String>("SELECT strftime('%Y-%m-%dT%H:%M:%fZ', 'now')")
        .fetch_one(&pool)
        .await
    {
        Ok(now) => (
            StatusCode::OK,
            Json(json!({ "status": "ready", "time": now })),
        ),
        Err(e) => {
            tracing::error!("Readiness check failed: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "not ready", "error": "Database connection failed" })),
            )
        }
    }
}

/// Fallback for unknown routes.
pub async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}
