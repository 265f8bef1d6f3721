use crate::session::SessionDuration;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

pub fn local_date(timestamp: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    timestamp.with_timezone(&offset).date_naive()
}

pub fn format_time_local(timestamp: DateTime<Utc>, offset: FixedOffset) -> String {
    timestamp.with_timezone(&offset).format("%H:%M").to_string()
}

/// Wall-clock time at which a window opened at `opened_at` closes, if it is
/// representable.
pub fn closing_time(opened_at: DateTime<Utc>, duration: SessionDuration, offset: FixedOffset) -> Option<String> {
    let closes_at = opened_at.checked_add_signed(duration.to_chrono()?)?;
    Some(format_time_local(closes_at, offset))
}

/// Footer shown under a session prompt.
pub fn window_footer(opened_at: DateTime<Utc>, duration: SessionDuration, offset: FixedOffset) -> String {
    match closing_time(opened_at, duration, offset) {
        Some(until) => format!("Open for {} (until {})", format_duration_secs(duration.as_secs()), until),
        None => format!("Open for {}", format_duration_secs(duration.as_secs())),
    }
}

pub fn format_duration_secs(secs: i64) -> String {
    let minutes = secs / 60;
    let seconds = secs % 60;

    match (minutes, seconds) {
        (0, s) => plural(s, "second"),
        (m, 0) => plural(m, "minute"),
        (m, s) => format!("{} {}", plural(m, "minute"), plural(s, "second")),
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", count, unit)
    }
}
