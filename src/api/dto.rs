//! Query parameters shared by the management handlers

use serde::Deserialize;

/// Default page size for log listings
pub const DEFAULT_LOG_LIMIT: usize = 50;

/// Query for GET /api/washrooms
#[derive(Debug, Default, Deserialize)]
pub struct WashroomListParams {
    pub business_id: Option<String>,
}

/// Query for GET /api/washrooms/:id/logs
#[derive(Debug, Default, Deserialize)]
pub struct LogListParams {
    pub limit: Option<usize>,
}

impl LogListParams {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LOG_LIMIT)
    }
}
