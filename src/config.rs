//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use chrono_tz::Tz;
use serde::Deserialize;
use std::path::PathBuf;

use crate::alerts::policy::{self, AlertPolicy, BusinessHours};
use crate::error::AppError;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub email: EmailConfig,
    pub alerts: AlertsConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public origin of the dashboard (e.g., "https://cleanwatch.example.com").
    /// Used as the only allowed CORS origin when set.
    pub public_url: Option<String>,
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Bearer-token secrets
///
/// Both are optional at load time. A missing secret fails the request that
/// needs it with a configuration error instead of refusing to boot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Shared secret the cron caller presents as `Authorization: Bearer ...`
    pub cron_secret: Option<String>,
    /// Token for the management API
    pub api_token: Option<String>,
}

/// Transactional email API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Send endpoint of the provider (default: Resend)
    pub api_url: String,
    /// Provider API key
    pub api_key: Option<String>,
    /// Sender address, e.g. "Cleanwatch <alerts@example.com>"
    pub from_address: Option<String>,
    /// Request timeout in seconds (default: 10)
    pub timeout_seconds: u64,
}

/// Overdue alert defaults
///
/// Per-washroom settings override these; anything a washroom leaves unset
/// falls back to the values here.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    /// IANA timezone used when a washroom has no business timezone
    pub timezone: String,
    /// Minutes since the last cleaning before a washroom counts as overdue
    pub default_overdue_minutes: i64,
    /// Minimum minutes between two alerts for the same washroom (default: 120)
    pub resend_cooldown_minutes: i64,
    /// Business hours start, "HH:MM"
    pub default_business_hours_start: String,
    /// Business hours end, "HH:MM"
    pub default_business_hours_end: String,
    /// Days alerts may be sent on, e.g. ["mon", "tue"]
    pub default_alert_days: Vec<String>,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// In-process scheduler for deployments without an external cron
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// Seconds between runs (default: 1800)
    pub interval_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_seconds: 1800,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AlertsConfig {
    /// Timezone used for washrooms without a business timezone
    pub fn default_timezone(&self) -> Result<Tz, AppError> {
        policy::parse_timezone(&self.timezone).map_err(as_config_error)
    }

    /// Build the fallback alert policy from configuration
    pub fn default_policy(&self) -> Result<AlertPolicy, AppError> {
        let start = policy::parse_time_of_day(&self.default_business_hours_start)
            .map_err(as_config_error)?;
        let end =
            policy::parse_time_of_day(&self.default_business_hours_end).map_err(as_config_error)?;
        let alert_days =
            policy::parse_alert_days(&self.default_alert_days).map_err(as_config_error)?;

        Ok(AlertPolicy {
            business_hours: BusinessHours { start, end },
            alert_days,
            overdue_threshold: policy::parse_minutes(
                self.default_overdue_minutes,
                "default_overdue_minutes",
            )
            .map_err(as_config_error)?,
            resend_cooldown: policy::parse_minutes(
                self.resend_cooldown_minutes,
                "resend_cooldown_minutes",
            )
            .map_err(as_config_error)?,
        })
    }
}

/// Settings parsers report bad input as validation errors; at load time the
/// same input is a configuration error.
fn as_config_error(error: AppError) -> AppError {
    match error {
        AppError::Validation(message) => AppError::Config(format!("alerts: {message}")),
        other => other,
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (CLEANWATCH_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.path", "data/cleanwatch.db")?
            .set_default("email.api_url", "https://api.resend.com/emails")?
            .set_default("email.timeout_seconds", 10)?
            .set_default("alerts.timezone", "UTC")?
            .set_default("alerts.default_overdue_minutes", 180)?
            .set_default("alerts.resend_cooldown_minutes", 120)?
            .set_default("alerts.default_business_hours_start", "08:00")?
            .set_default("alerts.default_business_hours_end", "18:00")?
            .set_default(
                "alerts.default_alert_days",
                vec!["mon", "tue", "wed", "thu", "fri"],
            )?
            .set_default("alerts.scheduler.enabled", false)?
            .set_default("alerts.scheduler.interval_seconds", 1800)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (CLEANWATCH_*)
            .add_source(
                Environment::with_prefix("CLEANWATCH")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("alerts.default_alert_days")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Check static settings.
    ///
    /// Secrets are not checked here; see [`AuthConfig`].
    pub fn validate(&self) -> Result<(), AppError> {
        if self.alerts.default_overdue_minutes <= 0 {
            return Err(AppError::Config(
                "alerts.default_overdue_minutes must be greater than 0".to_string(),
            ));
        }

        if self.alerts.resend_cooldown_minutes < 0 {
            return Err(AppError::Config(
                "alerts.resend_cooldown_minutes must not be negative".to_string(),
            ));
        }

        self.alerts.default_timezone()?;
        self.alerts.default_policy()?;

        if self.alerts.scheduler.enabled && self.alerts.scheduler.interval_seconds == 0 {
            return Err(AppError::Config(
                "alerts.scheduler.interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.email.timeout_seconds == 0 {
            return Err(AppError::Config(
                "email.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        url::Url::parse(&self.email.api_url).map_err(|e| {
            AppError::Config(format!("email.api_url is not a valid URL: {e}"))
        })?;

        if let Some(public_url) = &self.server.public_url {
            url::Url::parse(public_url).map_err(|e| {
                AppError::Config(format!("server.public_url is not a valid URL: {e}"))
            })?;
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(AppError::Config(format!(
                "logging.format must be \"pretty\" or \"json\", got \"{}\"",
                self.logging.format
            )));
        }

        self.logging.level.parse::<tracing::Level>().map_err(|_| {
            AppError::Config(format!(
                "logging.level \"{}\" is not a log level",
                self.logging.level
            ))
        })?;

        Ok(())
    }
}

/// Fully populated configuration for unit tests
#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            public_url: None,
        },
        database: DatabaseConfig {
            path: PathBuf::from("/tmp/cleanwatch-test.db"),
        },
        auth: AuthConfig {
            cron_secret: Some("cron-secret".to_string()),
            api_token: Some("api-token".to_string()),
        },
        email: EmailConfig {
            api_url: "https://api.resend.com/emails".to_string(),
            api_key: Some("re_test".to_string()),
            from_address: Some("alerts@example.com".to_string()),
            timeout_seconds: 10,
        },
        alerts: AlertsConfig {
            timezone: "America/Toronto".to_string(),
            default_overdue_minutes: 180,
            resend_cooldown_minutes: 120,
            default_business_hours_start: "08:00".to_string(),
            default_business_hours_end: "18:00".to_string(),
            default_alert_days: vec!["mon".to_string(), "fri".to_string()],
            scheduler: SchedulerConfig::default(),
        },
        logging: LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}
