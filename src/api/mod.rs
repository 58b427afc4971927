//! API layer
//!
//! HTTP handlers for:
//! - Cron trigger for the overdue check
//! - Management API (businesses, washrooms, cleaning logs)
//! - Metrics (Prometheus)

mod alerts;
mod businesses;
mod cron;
mod dto;
mod logs;
pub mod metrics;
mod washrooms;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::AppState;
use crate::auth::{require_api_token, require_cron_secret};

pub use dto::{LogListParams, WashroomListParams};
pub use metrics::metrics_router;

/// Create the cron router
///
/// Routes:
/// - GET|POST /api/cron/check-overdue
///
/// Both methods are accepted since hosted schedulers differ in which one
/// they send.
pub fn cron_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/check-overdue",
            get(cron::check_overdue).post(cron::check_overdue),
        )
        .route_layer(middleware::from_fn_with_state(state, require_cron_secret))
}

/// Create the management router
///
/// Routes:
/// - POST|GET /api/businesses
/// - GET|PATCH|DELETE /api/businesses/:id
/// - POST|GET /api/washrooms
/// - GET|PATCH|DELETE /api/washrooms/:id
/// - POST|GET /api/washrooms/:id/logs
/// - GET /api/logs/:id
/// - GET /api/alerts/overdue
pub fn management_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/businesses",
            post(businesses::create_business).get(businesses::list_businesses),
        )
        .route(
            "/businesses/:id",
            get(businesses::get_business)
                .patch(businesses::update_business)
                .delete(businesses::delete_business),
        )
        .route(
            "/washrooms",
            post(washrooms::create_washroom).get(washrooms::list_washrooms),
        )
        .route(
            "/washrooms/:id",
            get(washrooms::get_washroom)
                .patch(washrooms::update_washroom)
                .delete(washrooms::delete_washroom),
        )
        .route(
            "/washrooms/:id/logs",
            post(logs::record_log).get(logs::list_logs),
        )
        .route("/logs/:id", get(logs::get_log))
        .route("/alerts/overdue", get(alerts::overdue_preview))
        .route_layer(middleware::from_fn_with_state(state, require_api_token))
}
