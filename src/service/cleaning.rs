//! Cleaning log service
//!
//! Staff submit a checklist after each cleaning; the log's status is
//! derived from it and the washroom's last-cleaned timestamp advances.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::data::{
    ChecklistItem, CleaningLog, CleaningLogDetail, CleaningStatus, Database, EntityId,
};
use crate::error::AppError;
use crate::metrics::CLEANING_LOGS_RECORDED_TOTAL;

/// Tolerated clock skew for `cleaned_at` values reported by devices
const MAX_FUTURE_SKEW_SECONDS: i64 = 60;

/// Upper bound for log listings
pub const MAX_LOG_PAGE: usize = 200;

/// One checklist line as submitted
#[derive(Debug, Clone, Deserialize)]
pub struct NewChecklistItem {
    pub label: String,
    #[serde(default)]
    pub checked: bool,
}

/// A cleaning log as submitted by staff
#[derive(Debug, Clone, Deserialize)]
pub struct NewCleaningLog {
    pub cleaner_name: String,
    #[serde(default)]
    pub notes: Option<String>,
    /// Defaults to the time of submission
    #[serde(default)]
    pub cleaned_at: Option<DateTime<Utc>>,
    pub items: Vec<NewChecklistItem>,
}

/// Cleaning log service
pub struct CleaningService {
    db: Arc<Database>,
}

impl CleaningService {
    /// Create new cleaning service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Validate and store a cleaning log
    ///
    /// # Errors
    /// `NotFound` for an unknown washroom, `Validation` for an empty cleaner
    /// name, an empty or blank checklist, or a `cleaned_at` in the future.
    pub async fn record_log(
        &self,
        washroom_id: &str,
        input: NewCleaningLog,
        now: DateTime<Utc>,
    ) -> Result<CleaningLogDetail, AppError> {
        let cleaner_name = input.cleaner_name.trim();
        if cleaner_name.is_empty() {
            return Err(AppError::Validation(
                "cleaner_name cannot be empty".to_string(),
            ));
        }

        if input.items.is_empty() {
            return Err(AppError::Validation(
                "checklist must contain at least one item".to_string(),
            ));
        }

        let cleaned_at = input.cleaned_at.unwrap_or(now);
        if cleaned_at > now + Duration::seconds(MAX_FUTURE_SKEW_SECONDS) {
            return Err(AppError::Validation(
                "cleaned_at cannot be in the future".to_string(),
            ));
        }

        let log_id = EntityId::new().0;
        let items = input
            .items
            .into_iter()
            .enumerate()
            .map(|(position, item)| {
                let label = item.label.trim();
                if label.is_empty() {
                    return Err(AppError::Validation(format!(
                        "checklist item {} has an empty label",
                        position + 1
                    )));
                }
                Ok(ChecklistItem {
                    id: EntityId::new().0,
                    log_id: log_id.clone(),
                    label: label.to_string(),
                    checked: item.checked,
                    position: position as i64,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let log = CleaningLog {
            id: log_id,
            washroom_id: washroom_id.to_string(),
            cleaner_name: cleaner_name.to_string(),
            status: CleaningStatus::from_checklist(&items).as_str().to_string(),
            notes: input
                .notes
                .map(|notes| notes.trim().to_string())
                .filter(|notes| !notes.is_empty()),
            cleaned_at,
            created_at: now,
        };

        self.db.insert_cleaning_log(&log, &items).await?;
        CLEANING_LOGS_RECORDED_TOTAL.inc();

        tracing::info!(
            log_id = %log.id,
            washroom_id = %log.washroom_id,
            status = %log.status,
            items = items.len(),
            "Cleaning log recorded"
        );

        Ok(CleaningLogDetail { log, items })
    }

    /// Get a log with its checklist
    pub async fn get_log(&self, id: &str) -> Result<CleaningLogDetail, AppError> {
        let log = self.db.get_cleaning_log(id).await?.ok_or(AppError::NotFound)?;
        let items = self.db.get_checklist_items(&log.id).await?;
        Ok(CleaningLogDetail { log, items })
    }

    /// Newest logs of a washroom; `limit` is clamped to `1..=MAX_LOG_PAGE`
    pub async fn list_logs(
        &self,
        washroom_id: &str,
        limit: usize,
    ) -> Result<Vec<CleaningLog>, AppError> {
        if self.db.get_washroom(washroom_id).await?.is_none() {
            return Err(AppError::NotFound);
        }
        self.db
            .list_cleaning_logs(washroom_id, limit.clamp(1, MAX_LOG_PAGE))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Washroom;
    use tempfile::TempDir;

    async fn setup() -> (CleaningService, Arc<Database>, String, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(Database::connect(&temp_dir.path().join("test.db")).await.unwrap());

        let now = Utc::now();
        let washroom = Washroom {
            id: EntityId::new().0,
            business_id: None,
            name: "Lobby".to_string(),
            location_description: None,
            alert_emails: vec![],
            alerts_enabled: true,
            overdue_threshold_minutes: None,
            business_hours_start: None,
            business_hours_end: None,
            alert_days: None,
            last_cleaned_at: None,
            last_alert_sent_at: None,
            last_alert_status: None,
            created_at: now,
            updated_at: now,
        };
        db.insert_washroom(&washroom).await.unwrap();

        (CleaningService::new(db.clone()), db, washroom.id, temp_dir)
    }

    fn submission(items: &[(&str, bool)]) -> NewCleaningLog {
        NewCleaningLog {
            cleaner_name: " Priya ".to_string(),
            notes: Some("  ".to_string()),
            cleaned_at: None,
            items: items
                .iter()
                .map(|(label, checked)| NewChecklistItem {
                    label: label.to_string(),
                    checked: *checked,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn complete_checklist_marks_log_complete() {
        let (service, db, washroom_id, _temp_dir) = setup().await;
        let now = Utc::now();

        let detail = service
            .record_log(&washroom_id, submission(&[("Toilets", true), ("Sinks", true)]), now)
            .await
            .unwrap();

        assert_eq!(detail.log.status, "complete");
        assert_eq!(detail.log.cleaner_name, "Priya");
        assert!(detail.log.notes.is_none());
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[1].position, 1);

        let washroom = db.get_washroom(&washroom_id).await.unwrap().unwrap();
        assert_eq!(washroom.last_cleaned_at, Some(now));

        let fetched = service.get_log(&detail.log.id).await.unwrap();
        assert_eq!(fetched.items.len(), 2);
    }

    #[tokio::test]
    async fn unchecked_item_needs_attention() {
        let (service, _db, washroom_id, _temp_dir) = setup().await;

        let detail = service
            .record_log(
                &washroom_id,
                submission(&[("Toilets", true), ("Soap", false)]),
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(detail.log.status, "attention_needed");
    }

    #[tokio::test]
    async fn rejects_invalid_submissions() {
        let (service, _db, washroom_id, _temp_dir) = setup().await;
        let now = Utc::now();

        assert!(matches!(
            service.record_log(&washroom_id, submission(&[]), now).await,
            Err(AppError::Validation(_))
        ));

        assert!(matches!(
            service
                .record_log(&washroom_id, submission(&[("  ", true)]), now)
                .await,
            Err(AppError::Validation(message)) if message.contains("item 1")
        ));

        let mut future = submission(&[("Toilets", true)]);
        future.cleaned_at = Some(now + Duration::minutes(10));
        assert!(matches!(
            service.record_log(&washroom_id, future, now).await,
            Err(AppError::Validation(_))
        ));

        let mut nameless = submission(&[("Toilets", true)]);
        nameless.cleaner_name = String::new();
        assert!(service.record_log(&washroom_id, nameless, now).await.is_err());

        assert!(matches!(
            service
                .record_log("missing", submission(&[("Toilets", true)]), now)
                .await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn list_logs_requires_known_washroom() {
        let (service, _db, washroom_id, _temp_dir) = setup().await;

        assert!(service.list_logs(&washroom_id, 0).await.unwrap().is_empty());
        assert!(matches!(
            service.list_logs("missing", 10).await,
            Err(AppError::NotFound)
        ));
    }
}
