//! Timestamp and text formatting for display.

use chrono::{DateTime, Datelike, Local, TimeZone, Weekday};

use parley_proto::Timestamp;

/// Relative message time as seen from now, in local time.
#[must_use]
pub fn format_message_time(timestamp: Timestamp) -> String {
    format_message_time_at(timestamp, &Local::now())
}

/// Relative message time as seen from `now`:
///
/// - same day: `14:05`
/// - previous day: `Yesterday`
/// - same week (starting Sunday): weekday name
/// - same year: `Jan 5`
/// - otherwise: `Jan 5, 2023`
#[must_use]
pub fn format_message_time_at<Tz: TimeZone>(timestamp: Timestamp, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let Some(at) = to_datetime(timestamp, &now.timezone()) else {
        return String::new();
    };
    let date = at.date_naive();
    let today = now.date_naive();

    let pattern = if date == today {
        "%H:%M"
    } else if today.pred_opt() == Some(date) {
        return "Yesterday".to_string();
    } else if date.week(Weekday::Sun).first_day() == today.week(Weekday::Sun).first_day() {
        "%A"
    } else if date.year() == today.year() {
        "%b %-d"
    } else {
        "%b %-d, %Y"
    };
    at.format(pattern).to_string()
}

/// Absolute time, e.g. `Jan 20, 2024 10:30`, in local time.
#[must_use]
pub fn format_full_time(timestamp: Timestamp) -> String {
    to_datetime(timestamp, &Local)
        .map(|at| at.format("%b %-d, %Y %H:%M").to_string())
        .unwrap_or_default()
}

/// Shortens `text` to at most `max_chars` characters, ending in `...`
/// when cut.
#[must_use]
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

fn to_datetime<Tz: TimeZone>(timestamp: Timestamp, tz: &Tz) -> Option<DateTime<Tz>> {
    let millis = i64::try_from(timestamp.as_millis()).ok()?;
    tz.timestamp_millis_opt(millis).single()
}
