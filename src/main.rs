//! Cleanwatch binary entry point

use cleanwatch::{AppState, alerts::RunTrigger, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Load configuration from file and environment
/// 2. Initialize tracing/logging from the `logging` section
/// 3. Initialize AppState
/// 4. Build Axum router
/// 5. Start background tasks (overdue scheduler)
/// 6. Start HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration
    let config = config::AppConfig::load()?;

    // 2. Initialize tracing/logging; RUST_LOG takes precedence over logging.level
    init_tracing(&config.logging);

    tracing::info!("Starting Cleanwatch...");
    tracing::info!(
        timezone = %config.alerts.timezone,
        scheduler = config.alerts.scheduler.enabled,
        "Configuration loaded"
    );
    if config.auth.cron_secret.is_none() {
        tracing::warn!("auth.cron_secret is not set; the cron endpoint will fail until it is");
    }
    if config.auth.api_token.is_none() {
        tracing::warn!("auth.api_token is not set; the management API will fail until it is");
    }

    cleanwatch::metrics::init_metrics();

    // 3. Initialize application state
    let state = AppState::new(config.clone()).await?;

    // 4. Build Axum router
    let app = cleanwatch::build_router(state.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // 5. Start background tasks
    if config.alerts.scheduler.enabled {
        spawn_overdue_scheduler(state.clone());
    }

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(logging: &config::LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("cleanwatch={},tower_http=debug", logging.level.to_lowercase()).into()
    });

    if logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Spawn the in-process overdue check loop
///
/// Runs the same check as the cron endpoint. Runs that fail are logged and
/// the loop keeps going.
fn spawn_overdue_scheduler(state: AppState) {
    tokio::spawn(async move {
        let interval_secs = state.config.alerts.scheduler.interval_seconds.max(1);
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            tracing::info!("Running scheduled overdue check...");
            let result = match state.overdue_checker() {
                Ok(checker) => checker.run(RunTrigger::Scheduler, chrono::Utc::now()).await,
                Err(error) => Err(error),
            };
            match result {
                Ok(report) => tracing::info!(
                    alerts_sent = report.alerts_sent,
                    failed = report.failed,
                    "Scheduled overdue check completed"
                ),
                Err(error) => tracing::error!(%error, "Scheduled overdue check failed"),
            }
        }
    });

    tracing::info!("Overdue scheduler spawned");
}
