use chrono::{DateTime, Local, Utc};

/// Shown when a reset time has already passed but fresh usage has not arrived.
pub const RESETTING_TEXT: &str = "Resetting...";

/// Shown when a quota is exhausted but its reset time is unknown.
pub const WAITING_TEXT: &str = "Waiting...";

/// Returns "{round(p*100)}%" for a 0-1 usage fraction.
pub fn format_percent(fraction: f64) -> String {
    format!("{}%", (fraction * 100.0).round() as i64)
}

/// Humanized time until `resets_at`, at most two units: "2h 15m", "1d 3h", "45m".
/// Anything under a minute shows as "1m"; a past reset shows "Resetting...".
pub fn format_countdown(resets_at: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    let total_seconds = (*resets_at - now).num_seconds();
    if total_seconds <= 0 {
        return RESETTING_TEXT.to_string();
    }

    let total_minutes = (total_seconds / 60).max(1);
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;

    let parts: Vec<String> = [(days, "d"), (hours, "h"), (minutes, "m")]
        .into_iter()
        .filter(|(value, _)| *value > 0)
        .take(2)
        .map(|(value, unit)| format!("{}{}", value, unit))
        .collect();
    parts.join(" ")
}

/// Returns "Resets {day} at {time}", e.g. "Resets Tomorrow at 1:00 AM".
pub fn format_reset_datetime(resets_at: &DateTime<Utc>) -> String {
    let local_reset = resets_at.with_timezone(&Local);
    let today = Local::now().date_naive();
    let tomorrow = today + chrono::Duration::days(1);
    let reset_date = local_reset.date_naive();

    let day_str = if reset_date == today {
        "Today".to_string()
    } else if reset_date == tomorrow {
        "Tomorrow".to_string()
    } else {
        local_reset.format("%a").to_string()
    };

    format!(
        "Resets {} at {}",
        day_str,
        local_reset.format("%-I:%M %p")
    )
}

/// Returns "[████░░░░░░░░]" where █ = used portion. Values above 100 render full.
pub fn format_usage_bar(used_percent: f64, width: usize) -> String {
    let used_percent = used_percent.clamp(0.0, 100.0);
    let used_blocks = ((used_percent / 100.0) * width as f64).round() as usize;
    let free_blocks = width.saturating_sub(used_blocks);

    format!("[{}{}]", "█".repeat(used_blocks), "░".repeat(free_blocks))
}
