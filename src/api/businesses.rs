//! Business endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;

use crate::AppState;
use crate::data::Business;
use crate::error::AppError;
use crate::service::{BusinessPatch, NewBusiness};

/// POST /api/businesses
pub async fn create_business(
    State(state): State<AppState>,
    Json(input): Json<NewBusiness>,
) -> Result<(StatusCode, Json<Business>), AppError> {
    let business = state.locations().create_business(input, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(business)))
}

/// GET /api/businesses
pub async fn list_businesses(
    State(state): State<AppState>,
) -> Result<Json<Vec<Business>>, AppError> {
    Ok(Json(state.locations().list_businesses().await?))
}

/// GET /api/businesses/:id
pub async fn get_business(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Business>, AppError> {
    Ok(Json(state.locations().get_business(&id).await?))
}

/// PATCH /api/businesses/:id
pub async fn update_business(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<BusinessPatch>,
) -> Result<Json<Business>, AppError> {
    let business = state
        .locations()
        .update_business(&id, patch, Utc::now())
        .await?;
    Ok(Json(business))
}

/// DELETE /api/businesses/:id
///
/// Washrooms of the business are kept and detached.
pub async fn delete_business(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.locations().delete_business(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
