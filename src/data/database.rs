//! SQLite database operations
//!
//! All database access goes through this module.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

fn encode_string_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

fn decode_string_list(raw: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(raw).unwrap_or_else(|error| {
        tracing::warn!(%error, raw, "Ignoring malformed string list column");
        Vec::new()
    })
}

#[derive(sqlx::FromRow)]
struct BusinessRow {
    id: String,
    name: String,
    timezone: Option<String>,
    alert_emails: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BusinessRow> for Business {
    fn from(row: BusinessRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            timezone: row.timezone,
            alert_emails: decode_string_list(&row.alert_emails),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct WashroomRow {
    id: String,
    business_id: Option<String>,
    name: String,
    location_description: Option<String>,
    alert_emails: String,
    alerts_enabled: bool,
    overdue_threshold_minutes: Option<i64>,
    business_hours_start: Option<String>,
    business_hours_end: Option<String>,
    alert_days: Option<String>,
    last_cleaned_at: Option<DateTime<Utc>>,
    last_alert_sent_at: Option<DateTime<Utc>>,
    last_alert_status: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<WashroomRow> for Washroom {
    fn from(row: WashroomRow) -> Self {
        Self {
            id: row.id,
            business_id: row.business_id,
            name: row.name,
            location_description: row.location_description,
            alert_emails: decode_string_list(&row.alert_emails),
            alerts_enabled: row.alerts_enabled,
            overdue_threshold_minutes: row.overdue_threshold_minutes,
            business_hours_start: row.business_hours_start,
            business_hours_end: row.business_hours_end,
            alert_days: row.alert_days.as_deref().map(decode_string_list),
            last_cleaned_at: row.last_cleaned_at,
            last_alert_sent_at: row.last_alert_sent_at,
            last_alert_status: row.last_alert_status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        // Create connection string
        let connection_string = format!("sqlite:{}?mode=rwc", path.display());

        // Create connection pool
        let pool = SqlitePool::connect(&connection_string).await?;

        // Run migrations
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Businesses
    // =========================================================================

    pub async fn insert_business(&self, business: &Business) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO businesses (id, name, timezone, alert_emails, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&business.id)
        .bind(&business.name)
        .bind(&business.timezone)
        .bind(encode_string_list(&business.alert_emails))
        .bind(business.created_at)
        .bind(business.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_business(&self, id: &str) -> Result<Option<Business>, AppError> {
        let row = sqlx::query_as::<_, BusinessRow>("SELECT * FROM businesses WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Business::from))
    }

    /// List all businesses ordered by name
    pub async fn list_businesses(&self) -> Result<Vec<Business>, AppError> {
        let rows = sqlx::query_as::<_, BusinessRow>(
            "SELECT * FROM businesses ORDER BY name COLLATE NOCASE, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Business::from).collect())
    }

    /// Update name, timezone and alert recipients
    ///
    /// # Returns
    /// `true` if updated, `false` if no matching row exists.
    pub async fn update_business(&self, business: &Business) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE businesses
            SET name = ?, timezone = ?, alert_emails = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&business.name)
        .bind(&business.timezone)
        .bind(encode_string_list(&business.alert_emails))
        .bind(business.updated_at)
        .bind(&business.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a business. Its washrooms are kept and detached.
    pub async fn delete_business(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM businesses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // Washrooms
    // =========================================================================

    pub async fn insert_washroom(&self, washroom: &Washroom) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO washrooms (
                id, business_id, name, location_description, alert_emails, alerts_enabled,
                overdue_threshold_minutes, business_hours_start, business_hours_end, alert_days,
                last_cleaned_at, last_alert_sent_at, last_alert_status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&washroom.id)
        .bind(&washroom.business_id)
        .bind(&washroom.name)
        .bind(&washroom.location_description)
        .bind(encode_string_list(&washroom.alert_emails))
        .bind(washroom.alerts_enabled)
        .bind(washroom.overdue_threshold_minutes)
        .bind(&washroom.business_hours_start)
        .bind(&washroom.business_hours_end)
        .bind(washroom.alert_days.as_deref().map(encode_string_list))
        .bind(washroom.last_cleaned_at)
        .bind(washroom.last_alert_sent_at)
        .bind(&washroom.last_alert_status)
        .bind(washroom.created_at)
        .bind(washroom.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_washroom(&self, id: &str) -> Result<Option<Washroom>, AppError> {
        let row = sqlx::query_as::<_, WashroomRow>("SELECT * FROM washrooms WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Washroom::from))
    }

    /// List washrooms, optionally restricted to one business
    pub async fn list_washrooms(&self, business_id: Option<&str>) -> Result<Vec<Washroom>, AppError> {
        let rows = match business_id {
            Some(business_id) => {
                sqlx::query_as::<_, WashroomRow>(
                    "SELECT * FROM washrooms WHERE business_id = ? ORDER BY name COLLATE NOCASE, id",
                )
                .bind(business_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, WashroomRow>(
                    "SELECT * FROM washrooms ORDER BY name COLLATE NOCASE, id",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(Washroom::from).collect())
    }

    /// Washrooms the overdue check should look at
    pub async fn list_alertable_washrooms(&self) -> Result<Vec<Washroom>, AppError> {
        let rows = sqlx::query_as::<_, WashroomRow>(
            "SELECT * FROM washrooms WHERE alerts_enabled = 1 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Washroom::from).collect())
    }

    /// Update the editable settings of a washroom.
    ///
    /// Cleaning and alert bookkeeping columns are left alone; they have
    /// their own writers.
    pub async fn update_washroom(&self, washroom: &Washroom) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE washrooms
            SET business_id = ?, name = ?, location_description = ?, alert_emails = ?,
                alerts_enabled = ?, overdue_threshold_minutes = ?, business_hours_start = ?,
                business_hours_end = ?, alert_days = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&washroom.business_id)
        .bind(&washroom.name)
        .bind(&washroom.location_description)
        .bind(encode_string_list(&washroom.alert_emails))
        .bind(washroom.alerts_enabled)
        .bind(washroom.overdue_threshold_minutes)
        .bind(&washroom.business_hours_start)
        .bind(&washroom.business_hours_end)
        .bind(washroom.alert_days.as_deref().map(encode_string_list))
        .bind(washroom.updated_at)
        .bind(&washroom.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a washroom with its cleaning logs
    pub async fn delete_washroom(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM washrooms WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // Alert bookkeeping
    // =========================================================================

    /// Take the alert slot for a washroom.
    ///
    /// Compare-and-swap on `last_alert_sent_at`: succeeds only if the column
    /// still holds `previous`, the value the caller evaluated the cooldown
    /// against. Overlapping or retried runs therefore send at most once per
    /// washroom per cooldown window.
    ///
    /// # Returns
    /// `true` if this caller owns the slot.
    pub async fn claim_alert_slot(
        &self,
        washroom_id: &str,
        previous: Option<DateTime<Utc>>,
        claimed_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE washrooms
            SET last_alert_sent_at = ?
            WHERE id = ? AND last_alert_sent_at IS ?
            "#,
        )
        .bind(claimed_at)
        .bind(washroom_id)
        .bind(previous)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Undo [`Database::claim_alert_slot`] after a failed send.
    ///
    /// Only restores `previous` if nobody has claimed the slot since.
    pub async fn release_alert_slot(
        &self,
        washroom_id: &str,
        claimed_at: DateTime<Utc>,
        previous: Option<DateTime<Utc>>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE washrooms
            SET last_alert_sent_at = ?
            WHERE id = ? AND last_alert_sent_at IS ?
            "#,
        )
        .bind(previous)
        .bind(washroom_id)
        .bind(claimed_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn record_alert_status(&self, washroom_id: &str, status: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE washrooms SET last_alert_status = ? WHERE id = ?")
            .bind(status)
            .bind(washroom_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // =========================================================================
    // Cleaning logs
    // =========================================================================

    /// Store a cleaning log with its checklist.
    ///
    /// Runs in one transaction and advances the washroom's
    /// `last_cleaned_at`, which never moves backwards when logs arrive out
    /// of order.
    pub async fn insert_cleaning_log(
        &self,
        log: &CleaningLog,
        items: &[ChecklistItem],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<Option<DateTime<Utc>>> =
            sqlx::query_scalar("SELECT last_cleaned_at FROM washrooms WHERE id = ?")
                .bind(&log.washroom_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(current) = current else {
            return Err(AppError::NotFound);
        };

        sqlx::query(
            r#"
            INSERT INTO cleaning_logs (id, washroom_id, cleaner_name, status, notes, cleaned_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&log.id)
        .bind(&log.washroom_id)
        .bind(&log.cleaner_name)
        .bind(&log.status)
        .bind(&log.notes)
        .bind(log.cleaned_at)
        .bind(log.created_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO checklist_items (id, log_id, label, checked, position)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&item.id)
            .bind(&item.log_id)
            .bind(&item.label)
            .bind(item.checked)
            .bind(item.position)
            .execute(&mut *tx)
            .await?;
        }

        if current.is_none_or(|cleaned_at| cleaned_at < log.cleaned_at) {
            sqlx::query("UPDATE washrooms SET last_cleaned_at = ? WHERE id = ?")
                .bind(log.cleaned_at)
                .bind(&log.washroom_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    pub async fn get_cleaning_log(&self, id: &str) -> Result<Option<CleaningLog>, AppError> {
        let log = sqlx::query_as::<_, CleaningLog>("SELECT * FROM cleaning_logs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(log)
    }

    /// Checklist of a log in its original order
    pub async fn get_checklist_items(&self, log_id: &str) -> Result<Vec<ChecklistItem>, AppError> {
        let items = sqlx::query_as::<_, ChecklistItem>(
            "SELECT * FROM checklist_items WHERE log_id = ? ORDER BY position",
        )
        .bind(log_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Most recent cleaning logs of a washroom, newest first
    pub async fn list_cleaning_logs(
        &self,
        washroom_id: &str,
        limit: usize,
    ) -> Result<Vec<CleaningLog>, AppError> {
        let logs = sqlx::query_as::<_, CleaningLog>(
            r#"
            SELECT * FROM cleaning_logs
            WHERE washroom_id = ?
            ORDER BY cleaned_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(washroom_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }
}
