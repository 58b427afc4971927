//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Business
// =============================================================================

/// A business operating one or more washrooms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: String,
    pub name: String,
    /// IANA timezone for business-hours checks (falls back to configuration)
    pub timezone: Option<String>,
    /// Recipients added to every overdue alert for this business's washrooms
    pub alert_emails: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Washroom
// =============================================================================

/// A physical restroom tracked for cleaning compliance
///
/// Unset alert settings fall back to the configured defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Washroom {
    pub id: String,
    pub business_id: Option<String>,
    pub name: String,
    /// Free-form location, e.g. "2nd floor, east wing"
    pub location_description: Option<String>,
    pub alert_emails: Vec<String>,
    pub alerts_enabled: bool,
    pub overdue_threshold_minutes: Option<i64>,
    /// "HH:MM"
    pub business_hours_start: Option<String>,
    /// "HH:MM"
    pub business_hours_end: Option<String>,
    /// Weekday keys, "mon".."sun"
    pub alert_days: Option<Vec<String>>,
    pub last_cleaned_at: Option<DateTime<Utc>>,
    pub last_alert_sent_at: Option<DateTime<Utc>>,
    /// Status string of the most recent overdue check that reached dispatch
    pub last_alert_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Cleaning logs
// =============================================================================

/// A completed inspection/cleaning
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CleaningLog {
    pub id: String,
    pub washroom_id: String,
    pub cleaner_name: String,
    /// Values: complete, attention_needed
    pub status: String,
    pub notes: Option<String>,
    /// When the cleaning happened (reported by staff)
    pub cleaned_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Overall result of a cleaning log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleaningStatus {
    /// Every checklist item was checked
    Complete,
    /// At least one item was left unchecked
    AttentionNeeded,
}

impl CleaningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::AttentionNeeded => "attention_needed",
        }
    }

    /// Derive the status from checklist results
    pub fn from_checklist(items: &[ChecklistItem]) -> Self {
        if items.iter().all(|item| item.checked) {
            Self::Complete
        } else {
            Self::AttentionNeeded
        }
    }
}

/// One line of a cleaning checklist
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChecklistItem {
    pub id: String,
    pub log_id: String,
    pub label: String,
    pub checked: bool,
    /// Zero-based order within the log
    pub position: i64,
}

/// Cleaning log together with its checklist
#[derive(Debug, Clone, Serialize)]
pub struct CleaningLogDetail {
    #[serde(flatten)]
    pub log: CleaningLog,
    pub items: Vec<ChecklistItem>,
}
