//! HTTP client for the transactional email API
//!
//! Speaks the Resend-style `POST /emails` JSON contract:
//! `{from, to, subject, text, html}` with a bearer API key.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{Mailer, OutgoingEmail};
use crate::config::EmailConfig;
use crate::error::AppError;

/// Production mailer
pub struct HttpMailer {
    http_client: Arc<reqwest::Client>,
    api_url: String,
    api_key: Option<String>,
    from_address: Option<String>,
    timeout: Duration,
}

impl HttpMailer {
    pub fn new(config: &EmailConfig, http_client: Arc<reqwest::Client>) -> Self {
        Self {
            http_client,
            api_url: config.api_url.clone(),
            api_key: non_empty(config.api_key.as_deref()),
            from_address: non_empty(config.from_address.as_deref()),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    fn api_key(&self) -> Result<&str, AppError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::Config("email.api_key is not set".to_string()))
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

/// Pull a human-readable message out of a provider error body
fn provider_error_message(status: reqwest::StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .or_else(|| value.get("error"))
                .and_then(|message| message.as_str())
                .map(ToOwned::to_owned)
        })
        .unwrap_or_else(|| body.chars().take(200).collect());

    if detail.is_empty() {
        format!("email provider returned {status}")
    } else {
        format!("email provider returned {status}: {detail}")
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError> {
        let api_key = self.api_key()?;

        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(email)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(recipients = email.to.len(), subject = %email.subject, "Email accepted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(AppError::Email(provider_error_message(status, &body)))
    }

    fn sender(&self) -> Result<String, AppError> {
        self.api_key()?;
        self.from_address
            .clone()
            .ok_or_else(|| AppError::Config("email.from_address is not set".to_string()))
    }
}
