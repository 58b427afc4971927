//! Cron-triggered overdue check

use axum::{extract::State, response::Json};
use chrono::Utc;

use crate::AppState;
use crate::alerts::{CheckReport, RunTrigger};
use crate::error::AppError;

/// GET|POST /api/cron/check-overdue
///
/// Runs one pass over all alert-enabled washrooms and reports what happened
/// to each. Per-washroom failures are part of the report; only run-level
/// problems (missing email credentials, database errors) fail the request.
pub async fn check_overdue(State(state): State<AppState>) -> Result<Json<CheckReport>, AppError> {
    let checker = state.overdue_checker()?;
    let report = checker.run(RunTrigger::Cron, Utc::now()).await?;
    Ok(Json(report))
}
