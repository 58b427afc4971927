//! Transactional email
//!
//! - `Mailer`: the seam the alert runner sends through
//! - `HttpMailer`: JSON-over-HTTPS client for the hosted email API
//! - `templates`: overdue alert composition

mod client;
mod templates;

pub use client::HttpMailer;
pub use templates::{OverdueAlert, overdue_alert_email};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppError;

/// A message ready to hand to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Sends email on behalf of the application
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message.
    ///
    /// # Errors
    /// `AppError::Config` when the mailer lacks credentials,
    /// `AppError::Email` when the provider refuses the message.
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError>;

    /// Sender address to put in `from`.
    ///
    /// Fails with `AppError::Config` when the mailer cannot send at all
    /// (missing API key or sender), so callers can reject a whole batch
    /// before touching any record.
    fn sender(&self) -> Result<String, AppError>;
}
