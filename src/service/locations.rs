//! Location service
//!
//! Businesses and the washrooms they operate. Alert settings are validated
//! and normalized here so the overdue check can trust stored values.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::alerts::{collect_recipients, policy};
use crate::data::{Business, Database, EntityId, Washroom};
use crate::error::AppError;

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`)
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

fn required_name(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn is_plausible_email(address: &str) -> bool {
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !address.chars().any(char::is_whitespace)
}

/// Trim, drop blanks and duplicates, reject anything that is not an address
fn normalize_emails(values: &[String]) -> Result<Vec<String>, AppError> {
    let emails = collect_recipients(values, &[]);
    if let Some(bad) = emails.iter().find(|email| !is_plausible_email(email)) {
        return Err(AppError::Validation(format!("invalid email address '{bad}'")));
    }
    Ok(emails)
}

fn normalize_timezone(value: Option<String>) -> Result<Option<String>, AppError> {
    normalize_optional_text(value)
        .map(|name| policy::parse_timezone(&name).map(|tz| tz.name().to_string()))
        .transpose()
}

fn normalize_time_of_day(value: Option<String>) -> Result<Option<String>, AppError> {
    normalize_optional_text(value)
        .map(|value| policy::parse_time_of_day(&value).map(|time| time.format("%H:%M").to_string()))
        .transpose()
}

/// Store weekdays as "mon".."sun"
fn normalize_alert_days(values: Option<Vec<String>>) -> Result<Option<Vec<String>>, AppError> {
    values
        .map(|values| {
            policy::parse_alert_days(&values).map(|days| {
                days.into_iter()
                    .map(|day| policy::weekday_key(day).to_string())
                    .collect()
            })
        })
        .transpose()
}

fn validate_threshold(minutes: Option<i64>) -> Result<Option<i64>, AppError> {
    match minutes {
        Some(minutes) if minutes <= 0 => Err(AppError::Validation(
            "overdue_threshold_minutes must be greater than 0".to_string(),
        )),
        Some(minutes) => {
            policy::parse_minutes(minutes, "overdue_threshold_minutes")?;
            Ok(Some(minutes))
        }
        None => Ok(None),
    }
}

/// Fields for a new business
#[derive(Debug, Clone, Deserialize)]
pub struct NewBusiness {
    pub name: String,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub alert_emails: Vec<String>,
}

/// Partial business update; `null` clears a nullable field
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusinessPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub timezone: Option<Option<String>>,
    pub alert_emails: Option<Vec<String>>,
}

/// Fields for a new washroom
#[derive(Debug, Clone, Deserialize)]
pub struct NewWashroom {
    pub name: String,
    #[serde(default)]
    pub business_id: Option<String>,
    #[serde(default)]
    pub location_description: Option<String>,
    #[serde(default)]
    pub alert_emails: Vec<String>,
    #[serde(default = "default_alerts_enabled")]
    pub alerts_enabled: bool,
    #[serde(default)]
    pub overdue_threshold_minutes: Option<i64>,
    #[serde(default)]
    pub business_hours_start: Option<String>,
    #[serde(default)]
    pub business_hours_end: Option<String>,
    #[serde(default)]
    pub alert_days: Option<Vec<String>>,
}

fn default_alerts_enabled() -> bool {
    true
}

/// Partial washroom update; `null` clears a nullable field
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WashroomPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub business_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub location_description: Option<Option<String>>,
    pub alert_emails: Option<Vec<String>>,
    pub alerts_enabled: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub overdue_threshold_minutes: Option<Option<i64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub business_hours_start: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub business_hours_end: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub alert_days: Option<Option<Vec<String>>>,
}

/// Location service
pub struct LocationService {
    db: Arc<Database>,
}

impl LocationService {
    /// Create new location service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    // =========================================================================
    // Businesses
    // =========================================================================

    pub async fn create_business(
        &self,
        input: NewBusiness,
        now: DateTime<Utc>,
    ) -> Result<Business, AppError> {
        let business = Business {
            id: EntityId::new().0,
            name: required_name(&input.name, "name")?,
            timezone: normalize_timezone(input.timezone)?,
            alert_emails: normalize_emails(&input.alert_emails)?,
            created_at: now,
            updated_at: now,
        };

        self.db.insert_business(&business).await?;
        tracing::info!(business_id = %business.id, name = %business.name, "Business created");

        Ok(business)
    }

    pub async fn get_business(&self, id: &str) -> Result<Business, AppError> {
        self.db.get_business(id).await?.ok_or(AppError::NotFound)
    }

    pub async fn list_businesses(&self) -> Result<Vec<Business>, AppError> {
        self.db.list_businesses().await
    }

    pub async fn update_business(
        &self,
        id: &str,
        patch: BusinessPatch,
        now: DateTime<Utc>,
    ) -> Result<Business, AppError> {
        let mut business = self.get_business(id).await?;

        if let Some(name) = patch.name {
            business.name = required_name(&name, "name")?;
        }
        if let Some(timezone) = patch.timezone {
            business.timezone = normalize_timezone(timezone)?;
        }
        if let Some(alert_emails) = patch.alert_emails {
            business.alert_emails = normalize_emails(&alert_emails)?;
        }
        business.updated_at = now;

        if !self.db.update_business(&business).await? {
            return Err(AppError::NotFound);
        }

        Ok(business)
    }

    pub async fn delete_business(&self, id: &str) -> Result<(), AppError> {
        if !self.db.delete_business(id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(business_id = %id, "Business deleted");
        Ok(())
    }

    // =========================================================================
    // Washrooms
    // =========================================================================

    async fn ensure_business_exists(&self, business_id: Option<&str>) -> Result<(), AppError> {
        let Some(business_id) = business_id else {
            return Ok(());
        };
        if self.db.get_business(business_id).await?.is_none() {
            return Err(AppError::Validation(format!(
                "business '{business_id}' does not exist"
            )));
        }
        Ok(())
    }

    pub async fn create_washroom(
        &self,
        input: NewWashroom,
        now: DateTime<Utc>,
    ) -> Result<Washroom, AppError> {
        let business_id = normalize_optional_text(input.business_id);
        self.ensure_business_exists(business_id.as_deref()).await?;

        let washroom = Washroom {
            id: EntityId::new().0,
            business_id,
            name: required_name(&input.name, "name")?,
            location_description: normalize_optional_text(input.location_description),
            alert_emails: normalize_emails(&input.alert_emails)?,
            alerts_enabled: input.alerts_enabled,
            overdue_threshold_minutes: validate_threshold(input.overdue_threshold_minutes)?,
            business_hours_start: normalize_time_of_day(input.business_hours_start)?,
            business_hours_end: normalize_time_of_day(input.business_hours_end)?,
            alert_days: normalize_alert_days(input.alert_days)?,
            last_cleaned_at: None,
            last_alert_sent_at: None,
            last_alert_status: None,
            created_at: now,
            updated_at: now,
        };

        self.db.insert_washroom(&washroom).await?;
        tracing::info!(washroom_id = %washroom.id, name = %washroom.name, "Washroom created");

        Ok(washroom)
    }

    pub async fn get_washroom(&self, id: &str) -> Result<Washroom, AppError> {
        self.db.get_washroom(id).await?.ok_or(AppError::NotFound)
    }

    pub async fn list_washrooms(&self, business_id: Option<&str>) -> Result<Vec<Washroom>, AppError> {
        self.db.list_washrooms(business_id).await
    }

    pub async fn update_washroom(
        &self,
        id: &str,
        patch: WashroomPatch,
        now: DateTime<Utc>,
    ) -> Result<Washroom, AppError> {
        let mut washroom = self.get_washroom(id).await?;

        if let Some(name) = patch.name {
            washroom.name = required_name(&name, "name")?;
        }
        if let Some(business_id) = patch.business_id {
            let business_id = normalize_optional_text(business_id);
            self.ensure_business_exists(business_id.as_deref()).await?;
            washroom.business_id = business_id;
        }
        if let Some(location_description) = patch.location_description {
            washroom.location_description = normalize_optional_text(location_description);
        }
        if let Some(alert_emails) = patch.alert_emails {
            washroom.alert_emails = normalize_emails(&alert_emails)?;
        }
        if let Some(alerts_enabled) = patch.alerts_enabled {
            washroom.alerts_enabled = alerts_enabled;
        }
        if let Some(threshold) = patch.overdue_threshold_minutes {
            washroom.overdue_threshold_minutes = validate_threshold(threshold)?;
        }
        if let Some(start) = patch.business_hours_start {
            washroom.business_hours_start = normalize_time_of_day(start)?;
        }
        if let Some(end) = patch.business_hours_end {
            washroom.business_hours_end = normalize_time_of_day(end)?;
        }
        if let Some(alert_days) = patch.alert_days {
            washroom.alert_days = normalize_alert_days(alert_days)?;
        }
        washroom.updated_at = now;

        if !self.db.update_washroom(&washroom).await? {
            return Err(AppError::NotFound);
        }

        Ok(washroom)
    }

    pub async fn delete_washroom(&self, id: &str) -> Result<(), AppError> {
        if !self.db.delete_washroom(id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(washroom_id = %id, "Washroom deleted");
        Ok(())
    }
}
