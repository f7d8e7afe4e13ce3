use chrono::{DateTime, Local, Utc};

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max.saturating_sub(3)).collect::<String>() + "..."
}

/// Collapses whitespace (descriptions often carry hard line breaks).
pub(crate) fn single_line(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn format_updated(updated: Option<DateTime<Utc>>) -> String {
    updated
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub(crate) fn format_date_added(added: DateTime<Utc>) -> String {
    added
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// `m:ss` below an hour, `h:mm:ss` above.
pub(crate) fn format_position(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

pub(crate) fn heart(is_favorite: bool) -> &'static str {
    if is_favorite { "♥" } else { "·" }
}
