//! Overdue alert predicates
//!
//! Everything here is a pure function over explicit timestamps. Callers
//! resolve "now" and the washroom's timezone; nothing in this module reads
//! the clock.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

use crate::data::Washroom;
use crate::error::AppError;

/// Outcome of evaluating one washroom during an overdue check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    NotAlertDay,
    OutsideBusinessHours,
    NotOverdue,
    AlertRecentlySent,
    NoRecipients,
    AlertSent,
    SendFailed,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAlertDay => "not_alert_day",
            Self::OutsideBusinessHours => "outside_business_hours",
            Self::NotOverdue => "not_overdue",
            Self::AlertRecentlySent => "alert_recently_sent",
            Self::NoRecipients => "no_recipients",
            Self::AlertSent => "alert_sent",
            Self::SendFailed => "send_failed",
        }
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Daily window in local wall-clock time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Effective alert settings for one washroom
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertPolicy {
    pub business_hours: BusinessHours,
    pub alert_days: Vec<Weekday>,
    pub overdue_threshold: Duration,
    pub resend_cooldown: Duration,
}

/// Per-washroom timestamps the predicates look at
#[derive(Debug, Clone, Copy, Default)]
pub struct Snapshot {
    pub last_cleaned_at: Option<DateTime<Utc>>,
    pub last_alert_sent_at: Option<DateTime<Utc>>,
}

/// Result of [`evaluate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No alert; the status says why
    Skip(AlertStatus),
    /// An alert should go out. `overdue_by` is `None` when the washroom has
    /// never been cleaned.
    Due { overdue_by: Option<Duration> },
}

/// `start <= t < end`. A window whose start is after its end wraps past
/// midnight; equal bounds cover the whole day.
pub fn is_within_business_hours(local_time: NaiveTime, hours: &BusinessHours) -> bool {
    let BusinessHours { start, end } = *hours;
    if start == end {
        return true;
    }
    if start < end {
        local_time >= start && local_time < end
    } else {
        local_time >= start || local_time < end
    }
}

pub fn is_alert_day(weekday: Weekday, alert_days: &[Weekday]) -> bool {
    alert_days.contains(&weekday)
}

/// A washroom that was never cleaned is always overdue.
pub fn is_overdue(
    last_cleaned_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    threshold: Duration,
) -> bool {
    match last_cleaned_at {
        None => true,
        Some(cleaned_at) => now.signed_duration_since(cleaned_at) >= threshold,
    }
}

/// `true` while a previous alert is younger than `cooldown`.
pub fn is_in_cooldown(
    last_alert_sent_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> bool {
    match last_alert_sent_at {
        None => false,
        Some(sent_at) => now.signed_duration_since(sent_at) < cooldown,
    }
}

/// Apply the predicates in order: alert day, business hours, overdue,
/// cooldown. Day and hour checks use `now` converted to `tz`.
pub fn evaluate(policy: &AlertPolicy, tz: Tz, snapshot: &Snapshot, now: DateTime<Utc>) -> Decision {
    let local = now.with_timezone(&tz);

    if !is_alert_day(local.weekday(), &policy.alert_days) {
        return Decision::Skip(AlertStatus::NotAlertDay);
    }

    if !is_within_business_hours(local.time(), &policy.business_hours) {
        return Decision::Skip(AlertStatus::OutsideBusinessHours);
    }

    if !is_overdue(snapshot.last_cleaned_at, now, policy.overdue_threshold) {
        return Decision::Skip(AlertStatus::NotOverdue);
    }

    if is_in_cooldown(snapshot.last_alert_sent_at, now, policy.resend_cooldown) {
        return Decision::Skip(AlertStatus::AlertRecentlySent);
    }

    let overdue_by = snapshot
        .last_cleaned_at
        .map(|cleaned_at| now.signed_duration_since(cleaned_at) - policy.overdue_threshold);

    Decision::Due { overdue_by }
}

impl AlertPolicy {
    /// Overlay a washroom's own settings on `defaults`.
    ///
    /// Stored values are validated on write, so a parse failure here means
    /// the row was edited behind the API's back.
    pub fn for_washroom(defaults: &AlertPolicy, washroom: &Washroom) -> Result<Self, AppError> {
        let mut policy = defaults.clone();

        if let Some(start) = washroom.business_hours_start.as_deref() {
            policy.business_hours.start = parse_time_of_day(start)?;
        }
        if let Some(end) = washroom.business_hours_end.as_deref() {
            policy.business_hours.end = parse_time_of_day(end)?;
        }
        if let Some(days) = &washroom.alert_days {
            policy.alert_days = parse_alert_days(days)?;
        }
        if let Some(minutes) = washroom.overdue_threshold_minutes {
            policy.overdue_threshold = parse_minutes(minutes, "overdue_threshold_minutes")?;
        }

        Ok(policy)
    }
}

/// Longest interval a threshold or cooldown may span (one year)
pub const MAX_INTERVAL_MINUTES: i64 = 365 * 24 * 60;

/// Turn a minute count setting into a `Duration`.
///
/// Accepts `0..=MAX_INTERVAL_MINUTES`; callers that need a strictly
/// positive value check that themselves.
pub fn parse_minutes(minutes: i64, field: &str) -> Result<Duration, AppError> {
    if !(0..=MAX_INTERVAL_MINUTES).contains(&minutes) {
        return Err(AppError::Validation(format!(
            "{field} must be between 0 and {MAX_INTERVAL_MINUTES} minutes"
        )));
    }
    Duration::try_minutes(minutes)
        .ok_or_else(|| AppError::Validation(format!("{field} is out of range")))
}

/// Parse "HH:MM" (or "HH:MM:SS") into a wall-clock time.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, AppError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| AppError::Validation(format!("invalid time of day '{value}', expected HH:MM")))
}

/// Accepts "mon", "Monday", "TUE" and so on.
pub fn parse_weekday(value: &str) -> Result<Weekday, AppError> {
    value
        .trim()
        .parse::<Weekday>()
        .map_err(|_| AppError::Validation(format!("invalid weekday '{}'", value.trim())))
}

/// Parse a list of weekdays, dropping duplicates while keeping order.
pub fn parse_alert_days(values: &[String]) -> Result<Vec<Weekday>, AppError> {
    let mut days = Vec::with_capacity(values.len());
    for value in values {
        let day = parse_weekday(value)?;
        if !days.contains(&day) {
            days.push(day);
        }
    }
    Ok(days)
}

pub fn parse_timezone(value: &str) -> Result<Tz, AppError> {
    value
        .trim()
        .parse::<Tz>()
        .map_err(|_| AppError::Validation(format!("unknown timezone '{}'", value.trim())))
}

/// Canonical short form stored in the database ("mon".."sun").
pub fn weekday_key(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hm(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn weekday_policy() -> AlertPolicy {
        AlertPolicy {
            business_hours: BusinessHours {
                start: hm(8, 0),
                end: hm(18, 0),
            },
            alert_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            overdue_threshold: Duration::hours(3),
            resend_cooldown: Duration::hours(2),
        }
    }

    /// Wednesday 2024-05-15 at the given UTC wall-clock time
    fn wednesday_utc(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 15, hour, minute, 0).unwrap()
    }

    #[test]
    fn never_cleaned_is_always_overdue() {
        let now = wednesday_utc(12, 0);
        assert!(is_overdue(None, now, Duration::minutes(1)));
        assert!(is_overdue(None, now, Duration::days(365)));
    }

    #[test]
    fn overdue_threshold_is_inclusive() {
        let now = wednesday_utc(12, 0);
        let threshold = Duration::hours(3);

        assert!(!is_overdue(Some(now - Duration::minutes(179)), now, threshold));
        assert!(is_overdue(Some(now - Duration::hours(3)), now, threshold));
        assert!(is_overdue(Some(now - Duration::hours(5)), now, threshold));
    }

    #[test]
    fn cooldown_suppresses_recent_alerts() {
        let now = wednesday_utc(12, 0);
        let cooldown = Duration::hours(2);

        assert!(!is_in_cooldown(None, now, cooldown));
        assert!(is_in_cooldown(Some(now - Duration::minutes(30)), now, cooldown));
        assert!(is_in_cooldown(Some(now - Duration::minutes(119)), now, cooldown));
        assert!(!is_in_cooldown(Some(now - Duration::hours(2)), now, cooldown));
    }

    #[test]
    fn business_hours_daytime_window() {
        let hours = BusinessHours {
            start: hm(8, 0),
            end: hm(18, 0),
        };
        assert!(!is_within_business_hours(hm(7, 59), &hours));
        assert!(is_within_business_hours(hm(8, 0), &hours));
        assert!(is_within_business_hours(hm(17, 59), &hours));
        assert!(!is_within_business_hours(hm(18, 0), &hours));
    }

    #[test]
    fn business_hours_window_wrapping_midnight() {
        let hours = BusinessHours {
            start: hm(22, 0),
            end: hm(6, 0),
        };
        assert!(is_within_business_hours(hm(23, 30), &hours));
        assert!(is_within_business_hours(hm(2, 0), &hours));
        assert!(!is_within_business_hours(hm(6, 0), &hours));
        assert!(!is_within_business_hours(hm(12, 0), &hours));
    }

    #[test]
    fn equal_bounds_mean_open_all_day() {
        let hours = BusinessHours {
            start: hm(0, 0),
            end: hm(0, 0),
        };
        assert!(is_within_business_hours(hm(3, 17), &hours));
        assert!(is_within_business_hours(hm(23, 59), &hours));
    }

    #[test]
    fn alert_day_membership() {
        let days = [Weekday::Mon, Weekday::Fri];
        assert!(is_alert_day(Weekday::Mon, &days));
        assert!(!is_alert_day(Weekday::Sun, &days));
        assert!(!is_alert_day(Weekday::Mon, &[]));
    }

    #[test]
    fn evaluate_skips_days_outside_alert_list() {
        let policy = weekday_policy();
        // Saturday, well inside business hours, never cleaned
        let now = Utc.with_ymd_and_hms(2024, 5, 18, 12, 0, 0).unwrap();

        let decision = evaluate(&policy, Tz::UTC, &Snapshot::default(), now);
        assert_eq!(decision, Decision::Skip(AlertStatus::NotAlertDay));
    }

    #[test]
    fn evaluate_skips_outside_business_hours_even_when_overdue() {
        let policy = weekday_policy();
        let now = wednesday_utc(20, 0);

        let decision = evaluate(&policy, Tz::UTC, &Snapshot::default(), now);
        assert_eq!(decision, Decision::Skip(AlertStatus::OutsideBusinessHours));
    }

    #[test]
    fn evaluate_uses_local_time_of_the_timezone() {
        let policy = weekday_policy();
        // 14:00 UTC is 10:00 in Toronto (EDT) and 23:00 in Tokyo
        let now = wednesday_utc(14, 0);

        assert!(matches!(
            evaluate(&policy, chrono_tz::America::Toronto, &Snapshot::default(), now),
            Decision::Due { .. }
        ));
        assert_eq!(
            evaluate(&policy, chrono_tz::Asia::Tokyo, &Snapshot::default(), now),
            Decision::Skip(AlertStatus::OutsideBusinessHours)
        );
    }

    #[test]
    fn evaluate_uses_local_weekday() {
        let policy = weekday_policy();
        // Friday 23:30 UTC is already Saturday in Tokyo
        let now = Utc.with_ymd_and_hms(2024, 5, 17, 23, 30, 0).unwrap();
        let mut policy = policy;
        policy.business_hours = BusinessHours {
            start: hm(0, 0),
            end: hm(0, 0),
        };

        assert_eq!(
            evaluate(&policy, chrono_tz::Asia::Tokyo, &Snapshot::default(), now),
            Decision::Skip(AlertStatus::NotAlertDay)
        );
    }

    #[test]
    fn evaluate_reports_not_overdue() {
        let policy = weekday_policy();
        let now = wednesday_utc(12, 0);
        let snapshot = Snapshot {
            last_cleaned_at: Some(now - Duration::hours(1)),
            last_alert_sent_at: None,
        };

        assert_eq!(
            evaluate(&policy, Tz::UTC, &snapshot, now),
            Decision::Skip(AlertStatus::NotOverdue)
        );
    }

    #[test]
    fn evaluate_respects_resend_cooldown() {
        let policy = weekday_policy();
        let now = wednesday_utc(12, 0);
        let snapshot = Snapshot {
            last_cleaned_at: Some(now - Duration::hours(6)),
            last_alert_sent_at: Some(now - Duration::minutes(45)),
        };

        assert_eq!(
            evaluate(&policy, Tz::UTC, &snapshot, now),
            Decision::Skip(AlertStatus::AlertRecentlySent)
        );
    }

    #[test]
    fn evaluate_due_reports_how_late() {
        let policy = weekday_policy();
        let now = wednesday_utc(12, 0);
        let snapshot = Snapshot {
            last_cleaned_at: Some(now - Duration::hours(4)),
            last_alert_sent_at: Some(now - Duration::hours(3)),
        };

        assert_eq!(
            evaluate(&policy, Tz::UTC, &snapshot, now),
            Decision::Due {
                overdue_by: Some(Duration::hours(1))
            }
        );
        assert_eq!(
            evaluate(&policy, Tz::UTC, &Snapshot::default(), now),
            Decision::Due { overdue_by: None }
        );
    }

    #[test]
    fn parses_settings() {
        assert_eq!(parse_time_of_day("07:30").unwrap(), hm(7, 30));
        assert_eq!(parse_time_of_day(" 21:05:00 ").unwrap(), hm(21, 5));
        assert!(parse_time_of_day("7pm").is_err());

        assert_eq!(parse_weekday("Mon").unwrap(), Weekday::Mon);
        assert_eq!(parse_weekday("sunday").unwrap(), Weekday::Sun);
        assert!(parse_weekday("funday").is_err());

        let days = parse_alert_days(&["mon".to_string(), "MON".to_string(), "wed".to_string()])
            .unwrap();
        assert_eq!(days, vec![Weekday::Mon, Weekday::Wed]);

        assert_eq!(parse_timezone("Europe/Paris").unwrap(), chrono_tz::Europe::Paris);
        assert!(parse_timezone("Nowhere/Special").is_err());
    }

    #[test]
    fn minute_settings_are_bounded() {
        assert_eq!(parse_minutes(90, "x").unwrap(), Duration::minutes(90));
        assert_eq!(
            parse_minutes(MAX_INTERVAL_MINUTES, "x").unwrap(),
            Duration::days(365)
        );
        assert!(matches!(
            parse_minutes(MAX_INTERVAL_MINUTES + 1, "overdue_threshold_minutes"),
            Err(AppError::Validation(message)) if message.contains("overdue_threshold_minutes")
        ));
        assert!(parse_minutes(1_000_000_000_000_000, "x").is_err());
        assert!(parse_minutes(-1, "x").is_err());
    }

    #[test]
    fn status_strings_match_wire_format() {
        assert_eq!(AlertStatus::NotAlertDay.as_str(), "not_alert_day");
        assert_eq!(
            serde_json::to_value(AlertStatus::OutsideBusinessHours).unwrap(),
            serde_json::json!("outside_business_hours")
        );
        assert_eq!(AlertStatus::SendFailed.to_string(), "send_failed");
    }
}
