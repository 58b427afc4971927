//! Cleanwatch - washroom cleaning compliance
//!
//! Staff log cleanings against a checklist; a periodic check emails the
//! right people when a washroom goes too long without one during business
//! hours.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Cron trigger (shared-secret bearer)                      │
//! │  - Management API (API token bearer)                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │               Service / Alerts Layer                         │
//! │  - Location and cleaning log rules                          │
//! │  - Overdue policy and the check runner                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Data Layer / Email                           │
//! │  - SQLite (sqlx)                                            │
//! │  - Transactional email API (reqwest)                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `alerts`: overdue policy and the check runner
//! - `api`: HTTP handlers
//! - `auth`: bearer-token middleware
//! - `config`: Configuration management
//! - `data`: Database layer
//! - `email`: alert composition and delivery
//! - `error`: Error types
//! - `metrics`: Prometheus instruments
//! - `service`: Business logic layer

pub mod alerts;
pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod email;
pub mod error;
pub mod metrics;
pub mod service;

use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Outgoing email
    pub mailer: Arc<dyn email::Mailer>,
}

impl AppState {
    /// Initialize application state with the HTTP mailer
    ///
    /// # Errors
    /// Returns error if the database cannot be opened or migrated
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let http_client = Arc::new(
            reqwest::Client::builder()
                .user_agent(concat!("Cleanwatch/", env!("CARGO_PKG_VERSION")))
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .map_err(|e| error::AppError::Internal(e.into()))?,
        );
        let mailer = Arc::new(email::HttpMailer::new(&config.email, http_client));

        Self::with_mailer(config, mailer).await
    }

    /// Initialize application state around a given mailer
    ///
    /// # Errors
    /// Returns error if the database cannot be opened or migrated
    pub async fn with_mailer(
        config: config::AppConfig,
        mailer: Arc<dyn email::Mailer>,
    ) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let db = data::Database::connect(&config.database.path).await?;
        tracing::info!(path = %config.database.path.display(), "Database connected");

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            mailer,
        })
    }

    /// Overdue checker over this state's database and mailer
    ///
    /// # Errors
    /// `AppError::Config` when the alert defaults are invalid
    pub fn overdue_checker(&self) -> Result<alerts::OverdueChecker, error::AppError> {
        alerts::OverdueChecker::new(self.db.clone(), self.mailer.clone(), &self.config.alerts)
    }

    pub fn locations(&self) -> service::LocationService {
        service::LocationService::new(self.db.clone())
    }

    pub fn cleaning(&self) -> service::CleaningService {
        service::CleaningService::new(self.db.clone())
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, middleware};
    use tower_http::{
        compression::CompressionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
    };

    let cors_layer = build_cors_layer(&state.config.server);

    let api_routes = Router::new()
        .nest("/cron", api::cron_router(state.clone()))
        .merge(api::management_router(state.clone()));

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api", api_routes)
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
        .merge(api::metrics_router())
        .layer(middleware::from_fn(api::metrics::track_http_requests))
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    let Some(public_url) = server.public_url.as_deref() else {
        return CorsLayer::permissive();
    };

    let allowed_origin = public_url.trim_end_matches('/');
    match HeaderValue::from_str(allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server.public_url; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
