//! Washroom endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;

use super::dto::WashroomListParams;
use crate::AppState;
use crate::data::Washroom;
use crate::error::AppError;
use crate::service::{NewWashroom, WashroomPatch};

/// POST /api/washrooms
pub async fn create_washroom(
    State(state): State<AppState>,
    Json(input): Json<NewWashroom>,
) -> Result<(StatusCode, Json<Washroom>), AppError> {
    let washroom = state.locations().create_washroom(input, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(washroom)))
}

/// GET /api/washrooms?business_id=
pub async fn list_washrooms(
    State(state): State<AppState>,
    Query(params): Query<WashroomListParams>,
) -> Result<Json<Vec<Washroom>>, AppError> {
    let washrooms = state
        .locations()
        .list_washrooms(params.business_id.as_deref())
        .await?;
    Ok(Json(washrooms))
}

/// GET /api/washrooms/:id
pub async fn get_washroom(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Washroom>, AppError> {
    Ok(Json(state.locations().get_washroom(&id).await?))
}

/// PATCH /api/washrooms/:id
pub async fn update_washroom(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<WashroomPatch>,
) -> Result<Json<Washroom>, AppError> {
    let washroom = state
        .locations()
        .update_washroom(&id, patch, Utc::now())
        .await?;
    Ok(Json(washroom))
}

/// DELETE /api/washrooms/:id
///
/// Also removes the washroom's cleaning logs.
pub async fn delete_washroom(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.locations().delete_washroom(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
