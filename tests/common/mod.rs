//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cleanwatch::email::{Mailer, OutgoingEmail};
use cleanwatch::error::AppError;
use cleanwatch::{AppState, config};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const CRON_SECRET: &str = "test-cron-secret";
pub const API_TOKEN: &str = "test-api-token";

/// Mailer that keeps messages in memory instead of sending them
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    /// Recipients the fake provider refuses
    pub reject: Mutex<Vec<String>>,
    pub unconfigured: bool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError> {
        let rejected = self.reject.lock().unwrap().clone();
        if email.to.iter().any(|to| rejected.contains(to)) {
            return Err(AppError::Email("recipient rejected".to_string()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }

    fn sender(&self) -> Result<String, AppError> {
        if self.unconfigured {
            return Err(AppError::Config("email.api_key is not set".to_string()));
        }
        Ok("Cleanwatch <alerts@test.example.com>".to_string())
    }
}

/// Configuration for tests: all days and all hours are alert windows so
/// results do not depend on when the suite runs.
pub fn test_config(temp_dir: &TempDir) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            public_url: Some("https://dashboard.test.example.com".to_string()),
        },
        database: config::DatabaseConfig {
            path: temp_dir.path().join("test.db"),
        },
        auth: config::AuthConfig {
            cron_secret: Some(CRON_SECRET.to_string()),
            api_token: Some(API_TOKEN.to_string()),
        },
        email: config::EmailConfig {
            api_url: "https://api.resend.com/emails".to_string(),
            api_key: Some("re_test".to_string()),
            from_address: Some("alerts@test.example.com".to_string()),
            timeout_seconds: 10,
        },
        alerts: config::AlertsConfig {
            timezone: "UTC".to_string(),
            default_overdue_minutes: 180,
            resend_cooldown_minutes: 120,
            default_business_hours_start: "00:00".to_string(),
            default_business_hours_end: "00:00".to_string(),
            default_alert_days: ["mon", "tue", "wed", "thu", "fri", "sat", "sun"]
                .iter()
                .map(|day| day.to_string())
                .collect(),
            scheduler: config::SchedulerConfig::default(),
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with(|_| {}, RecordingMailer::default()).await
    }

    /// Create a test server with adjusted configuration and mailer
    pub async fn with(adjust: impl FnOnce(&mut config::AppConfig), mailer: RecordingMailer) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        adjust(&mut config);

        let mailer = Arc::new(mailer);
        let state = AppState::with_mailer(config, mailer.clone()).await.unwrap();

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = cleanwatch::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            mailer,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Management API request with the API token
    pub fn api(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(API_TOKEN)
    }

    /// Run the overdue check through the cron endpoint
    pub async fn check_overdue(&self) -> reqwest::Response {
        self.client
            .post(self.url("/api/cron/check-overdue"))
            .bearer_auth(CRON_SECRET)
            .send()
            .await
            .unwrap()
    }

    /// Create a business and return its JSON
    pub async fn create_business(&self, body: Value) -> Value {
        let response = self
            .api(reqwest::Method::POST, "/api/businesses")
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        response.json().await.unwrap()
    }

    /// Create a washroom and return its JSON
    pub async fn create_washroom(&self, body: Value) -> Value {
        let response = self
            .api(reqwest::Method::POST, "/api/washrooms")
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        response.json().await.unwrap()
    }

    /// Record a fully checked cleaning for a washroom
    pub async fn log_cleaning(&self, washroom_id: &str) -> Value {
        let response = self
            .api(
                reqwest::Method::POST,
                &format!("/api/washrooms/{washroom_id}/logs"),
            )
            .json(&json!({
                "cleaner_name": "Sam",
                "items": [
                    { "label": "Toilets", "checked": true },
                    { "label": "Sinks", "checked": true }
                ]
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        response.json().await.unwrap()
    }
}

/// Find the report line for a washroom
pub fn result_for<'a>(report: &'a Value, washroom_id: &Value) -> &'a Value {
    report["results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|result| &result["washroom_id"] == washroom_id)
        .unwrap()
}
