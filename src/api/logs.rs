//! Cleaning log endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;

use super::dto::LogListParams;
use crate::AppState;
use crate::data::{CleaningLog, CleaningLogDetail};
use crate::error::AppError;
use crate::service::NewCleaningLog;

/// POST /api/washrooms/:id/logs
pub async fn record_log(
    State(state): State<AppState>,
    Path(washroom_id): Path<String>,
    Json(input): Json<NewCleaningLog>,
) -> Result<(StatusCode, Json<CleaningLogDetail>), AppError> {
    let detail = state
        .cleaning()
        .record_log(&washroom_id, input, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/washrooms/:id/logs?limit=
///
/// Newest first.
pub async fn list_logs(
    State(state): State<AppState>,
    Path(washroom_id): Path<String>,
    Query(params): Query<LogListParams>,
) -> Result<Json<Vec<CleaningLog>>, AppError> {
    let logs = state
        .cleaning()
        .list_logs(&washroom_id, params.limit())
        .await?;
    Ok(Json(logs))
}

/// GET /api/logs/:id
pub async fn get_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CleaningLogDetail>, AppError> {
    Ok(Json(state.cleaning().get_log(&id).await?))
}
