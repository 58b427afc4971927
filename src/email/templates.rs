//! Overdue alert message composition

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use super::OutgoingEmail;

/// Facts an overdue alert reports
#[derive(Debug, Clone)]
pub struct OverdueAlert<'a> {
    pub washroom_name: &'a str,
    pub location_description: Option<&'a str>,
    pub business_name: Option<&'a str>,
    pub last_cleaned_at: Option<DateTime<Utc>>,
    pub overdue_threshold: Duration,
    /// Timezone the timestamps are shown in
    pub timezone: Tz,
}

/// "3h 05m", "45m"
fn format_elapsed(duration: Duration) -> String {
    let minutes = duration.num_minutes().max(0);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else {
        format!("{minutes}m")
    }
}

pub fn overdue_alert_email(
    alert: &OverdueAlert<'_>,
    from: String,
    to: Vec<String>,
    now: DateTime<Utc>,
) -> OutgoingEmail {
    let place = match alert.location_description {
        Some(location) if !location.trim().is_empty() => {
            format!("{} ({})", alert.washroom_name, location.trim())
        }
        _ => alert.washroom_name.to_string(),
    };

    let subject = match alert.business_name {
        Some(business) => format!("Cleaning overdue: {} at {}", alert.washroom_name, business),
        None => format!("Cleaning overdue: {}", alert.washroom_name),
    };

    let last_cleaned = match alert.last_cleaned_at {
        Some(cleaned_at) => format!(
            "Last cleaned {} ago, at {}.",
            format_elapsed(now.signed_duration_since(cleaned_at)),
            cleaned_at
                .with_timezone(&alert.timezone)
                .format("%Y-%m-%d %H:%M %Z")
        ),
        None => "No cleaning has been logged yet.".to_string(),
    };

    let threshold = format!(
        "The cleaning interval for this washroom is {}.",
        format_elapsed(alert.overdue_threshold)
    );

    let text = format!("{place} is overdue for cleaning.\n\n{last_cleaned}\n{threshold}\n");

    let html = format!(
        "<p><strong>{}</strong> is overdue for cleaning.</p><p>{}<br>{}</p>",
        html_escape::encode_text(&place),
        html_escape::encode_text(&last_cleaned),
        html_escape::encode_text(&threshold),
    );

    OutgoingEmail {
        from,
        to,
        subject,
        text,
        html,
    }
}
