use axum::{extract::State, response::Json};
use chrono::Utc;

use crate::AppState;
use crate::alerts::OverdueStatus;
use crate::error::AppError;

/// GET /api/alerts/overdue
///
/// What a check would decide right now, without sending anything.
pub async fn overdue_preview(
    State(state): State<AppState>,
) -> Result<Json<Vec<OverdueStatus>>, AppError> {
    let statuses = state.overdue_checker()?.preview(Utc::now()).await?;
    Ok(Json(statuses))
}
