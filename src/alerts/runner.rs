//! Overdue check
//!
//! Walks every alert-enabled washroom once, in sequence. Each record is
//! independent: lookups and sends that fail are logged and recorded as a
//! status on that record, and the batch carries on.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use super::policy::{self, AlertPolicy, AlertStatus, Decision, Snapshot};
use crate::config::AlertsConfig;
use crate::data::{Business, Database, Washroom};
use crate::email::{Mailer, OverdueAlert, overdue_alert_email};
use crate::error::AppError;
use crate::metrics::{EMAILS_SENT_TOTAL, WASHROOM_EVALUATIONS_TOTAL, observe_overdue_check};

/// What started a run, for metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTrigger {
    Cron,
    Scheduler,
}

impl RunTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cron => "cron",
            Self::Scheduler => "scheduler",
        }
    }
}

/// Per-washroom line of a run report
#[derive(Debug, Clone, Serialize)]
pub struct WashroomResult {
    pub washroom_id: String,
    pub washroom_name: String,
    pub status: AlertStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response body of the cron endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub success: bool,
    pub checked_at: DateTime<Utc>,
    pub total: usize,
    pub alerts_sent: usize,
    pub skipped: usize,
    pub failed: usize,
    pub results: Vec<WashroomResult>,
}

impl CheckReport {
    fn from_results(checked_at: DateTime<Utc>, results: Vec<WashroomResult>) -> Self {
        let alerts_sent = results
            .iter()
            .filter(|result| result.status == AlertStatus::AlertSent)
            .count();
        let failed = results
            .iter()
            .filter(|result| result.status == AlertStatus::SendFailed)
            .count();

        Self {
            success: true,
            checked_at,
            total: results.len(),
            alerts_sent,
            skipped: results.len() - alerts_sent - failed,
            failed,
            results,
        }
    }
}

/// Read-only view of where a washroom stands right now
#[derive(Debug, Clone, Serialize)]
pub struct OverdueStatus {
    pub washroom_id: String,
    pub washroom_name: String,
    pub business_id: Option<String>,
    pub overdue: bool,
    /// Minutes past the threshold; absent when never cleaned or not overdue
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overdue_minutes: Option<i64>,
    pub last_cleaned_at: Option<DateTime<Utc>>,
    pub last_alert_sent_at: Option<DateTime<Utc>>,
    /// `None` when a run right now would send an alert
    pub skip_reason: Option<AlertStatus>,
}

/// Merge washroom and business recipients.
///
/// Trims entries, drops blanks and removes case-insensitive duplicates,
/// keeping the first spelling seen.
pub fn collect_recipients(washroom_emails: &[String], business_emails: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    washroom_emails
        .iter()
        .chain(business_emails)
        .map(|email| email.trim())
        .filter(|email| !email.is_empty())
        .filter(|email| seen.insert(email.to_ascii_lowercase()))
        .map(ToOwned::to_owned)
        .collect()
}

/// Runs the overdue check against the database and mailer
pub struct OverdueChecker {
    db: Arc<Database>,
    mailer: Arc<dyn Mailer>,
    defaults: AlertPolicy,
    default_timezone: Tz,
}

/// Business lookups made during one run
type BusinessCache = HashMap<String, Option<Business>>;

impl OverdueChecker {
    pub fn new(
        db: Arc<Database>,
        mailer: Arc<dyn Mailer>,
        config: &AlertsConfig,
    ) -> Result<Self, AppError> {
        Ok(Self {
            db,
            mailer,
            defaults: config.default_policy()?,
            default_timezone: config.default_timezone()?,
        })
    }

    /// Evaluate every alert-enabled washroom and send the alerts that are due.
    ///
    /// # Errors
    /// Only run-level problems fail the call: a mailer without credentials
    /// or a failure to list washrooms. Everything per record ends up in the
    /// report.
    pub async fn run(&self, trigger: RunTrigger, now: DateTime<Utc>) -> Result<CheckReport, AppError> {
        let started = Instant::now();
        let result = self.run_inner(now).await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        observe_overdue_check(trigger.as_str(), outcome, started.elapsed());

        result
    }

    async fn run_inner(&self, now: DateTime<Utc>) -> Result<CheckReport, AppError> {
        let sender = self.mailer.sender()?;
        let washrooms = self.db.list_alertable_washrooms().await?;

        tracing::info!(count = washrooms.len(), "Running overdue check");

        let mut businesses = BusinessCache::new();
        let mut results = Vec::with_capacity(washrooms.len());
        for washroom in &washrooms {
            let result = self.process(washroom, &sender, now, &mut businesses).await;
            WASHROOM_EVALUATIONS_TOTAL
                .with_label_values(&[result.status.as_str()])
                .inc();
            tracing::info!(
                washroom_id = %result.washroom_id,
                status = %result.status,
                "Washroom evaluated"
            );
            results.push(result);
        }

        let report = CheckReport::from_results(now, results);
        tracing::info!(
            total = report.total,
            alerts_sent = report.alerts_sent,
            skipped = report.skipped,
            failed = report.failed,
            "Overdue check finished"
        );

        Ok(report)
    }

    /// Current overdue picture without sending anything
    pub async fn preview(&self, now: DateTime<Utc>) -> Result<Vec<OverdueStatus>, AppError> {
        let washrooms = self.db.list_alertable_washrooms().await?;
        let mut businesses = BusinessCache::new();
        let mut statuses = Vec::with_capacity(washrooms.len());

        for washroom in &washrooms {
            let business = self.business_for(washroom, &mut businesses).await;
            let (policy, tz) = self.effective_policy(washroom, business.as_ref());
            let snapshot = snapshot_of(washroom);

            let overdue = policy::is_overdue(snapshot.last_cleaned_at, now, policy.overdue_threshold);
            let overdue_minutes = snapshot
                .last_cleaned_at
                .filter(|_| overdue)
                .map(|cleaned_at| {
                    (now.signed_duration_since(cleaned_at) - policy.overdue_threshold).num_minutes()
                });

            let skip_reason = match policy::evaluate(&policy, tz, &snapshot, now) {
                Decision::Skip(status) => Some(status),
                Decision::Due { .. } => {
                    let business_emails = business
                        .as_ref()
                        .map(|business| business.alert_emails.as_slice())
                        .unwrap_or_default();
                    if collect_recipients(&washroom.alert_emails, business_emails).is_empty() {
                        Some(AlertStatus::NoRecipients)
                    } else {
                        None
                    }
                }
            };

            statuses.push(OverdueStatus {
                washroom_id: washroom.id.clone(),
                washroom_name: washroom.name.clone(),
                business_id: washroom.business_id.clone(),
                overdue,
                overdue_minutes,
                last_cleaned_at: washroom.last_cleaned_at,
                last_alert_sent_at: washroom.last_alert_sent_at,
                skip_reason,
            });
        }

        Ok(statuses)
    }

    async fn process(
        &self,
        washroom: &Washroom,
        sender: &str,
        now: DateTime<Utc>,
        businesses: &mut BusinessCache,
    ) -> WashroomResult {
        let result = |status: AlertStatus| WashroomResult {
            washroom_id: washroom.id.clone(),
            washroom_name: washroom.name.clone(),
            status,
            recipients: Vec::new(),
            error: None,
        };

        let business = self.business_for(washroom, businesses).await;
        let (policy, tz) = self.effective_policy(washroom, business.as_ref());
        let snapshot = snapshot_of(washroom);

        if let Decision::Skip(status) = policy::evaluate(&policy, tz, &snapshot, now) {
            return result(status);
        }

        let business_emails = business
            .as_ref()
            .map(|business| business.alert_emails.as_slice())
            .unwrap_or_default();
        let recipients = collect_recipients(&washroom.alert_emails, business_emails);
        if recipients.is_empty() {
            tracing::warn!(washroom_id = %washroom.id, "Washroom is overdue but has no alert recipients");
            self.record_status(washroom, AlertStatus::NoRecipients).await;
            return result(AlertStatus::NoRecipients);
        }

        match self
            .db
            .claim_alert_slot(&washroom.id, washroom.last_alert_sent_at, now)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(washroom_id = %washroom.id, "Alert slot already taken by another run");
                return result(AlertStatus::AlertRecentlySent);
            }
            Err(error) => {
                tracing::error!(washroom_id = %washroom.id, %error, "Failed to claim alert slot");
                return WashroomResult {
                    error: Some(error.to_string()),
                    ..result(AlertStatus::SendFailed)
                };
            }
        }

        let alert = OverdueAlert {
            washroom_name: &washroom.name,
            location_description: washroom.location_description.as_deref(),
            business_name: business.as_ref().map(|business| business.name.as_str()),
            last_cleaned_at: washroom.last_cleaned_at,
            overdue_threshold: policy.overdue_threshold,
            timezone: tz,
        };
        let email = overdue_alert_email(&alert, sender.to_string(), recipients.clone(), now);

        match self.mailer.send(&email).await {
            Ok(()) => {
                EMAILS_SENT_TOTAL.with_label_values(&["sent"]).inc();
                tracing::info!(
                    washroom_id = %washroom.id,
                    recipients = recipients.len(),
                    "Overdue alert sent"
                );
                self.record_status(washroom, AlertStatus::AlertSent).await;
                WashroomResult {
                    recipients,
                    ..result(AlertStatus::AlertSent)
                }
            }
            Err(error) => {
                EMAILS_SENT_TOTAL.with_label_values(&["failed"]).inc();
                tracing::error!(washroom_id = %washroom.id, %error, "Failed to send overdue alert");

                if let Err(release_error) = self
                    .db
                    .release_alert_slot(&washroom.id, now, washroom.last_alert_sent_at)
                    .await
                {
                    tracing::error!(
                        washroom_id = %washroom.id,
                        error = %release_error,
                        "Failed to release alert slot after send failure"
                    );
                }
                self.record_status(washroom, AlertStatus::SendFailed).await;

                WashroomResult {
                    recipients,
                    error: Some(error.to_string()),
                    ..result(AlertStatus::SendFailed)
                }
            }
        }
    }

    /// Fetch the washroom's business once per run. Lookup failures are
    /// logged and treated as "no business".
    async fn business_for(
        &self,
        washroom: &Washroom,
        businesses: &mut BusinessCache,
    ) -> Option<Business> {
        let business_id = washroom.business_id.as_deref()?;

        if let Some(cached) = businesses.get(business_id) {
            return cached.clone();
        }

        match self.db.get_business(business_id).await {
            Ok(business) => {
                businesses.insert(business_id.to_string(), business.clone());
                business
            }
            Err(error) => {
                tracing::warn!(
                    washroom_id = %washroom.id,
                    business_id,
                    %error,
                    "Business lookup failed; using washroom settings only"
                );
                None
            }
        }
    }

    fn effective_policy(&self, washroom: &Washroom, business: Option<&Business>) -> (AlertPolicy, Tz) {
        let policy = AlertPolicy::for_washroom(&self.defaults, washroom).unwrap_or_else(|error| {
            tracing::warn!(washroom_id = %washroom.id, %error, "Invalid washroom alert settings; using defaults");
            self.defaults.clone()
        });

        let tz = business
            .and_then(|business| business.timezone.as_deref())
            .map(|name| {
                policy::parse_timezone(name).unwrap_or_else(|error| {
                    tracing::warn!(washroom_id = %washroom.id, %error, "Invalid business timezone; using default");
                    self.default_timezone
                })
            })
            .unwrap_or(self.default_timezone);

        (policy, tz)
    }

    async fn record_status(&self, washroom: &Washroom, status: AlertStatus) {
        if let Err(error) = self.db.record_alert_status(&washroom.id, status.as_str()).await {
            tracing::warn!(washroom_id = %washroom.id, %error, "Failed to record alert status");
        }
    }
}

fn snapshot_of(washroom: &Washroom) -> Snapshot {
    Snapshot {
        last_cleaned_at: washroom.last_cleaned_at,
        last_alert_sent_at: washroom.last_alert_sent_at,
    }
}
