use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: u64,
    pub database: bool,
}

/// GET /api/system/status
/// Basic liveness: version, uptime, and a database ping. A failed ping is a
/// 503 like every other storage failure.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<SystemStatus>>, ApiError> {
    state
        .store()
        .ping()
        .await
        .map_err(|e| ApiError::StorageError(format!("Database ping failed: {e}")))?;

    Ok(Json(ApiResponse::success(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        database: true,
    })))
}
