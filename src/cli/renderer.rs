use chrono::{DateTime, Local, Utc};
use colored::{control, ColoredString, Colorize};

use crate::core::display::{reported_window, DisplayItem, SourceState, UsageColor};
use crate::core::formatter::{
    format_countdown, format_percent, format_reset_datetime, format_usage_bar,
};
use crate::core::models::usage::{CliUsage, UsageWindow, WebUsage};
use crate::core::monitor::MonitorState;
use crate::core::providers::Source;

const BAR_WIDTH: usize = 12;

/// Terminal glyph for a source icon name.
pub fn icon_glyph(icon: &str) -> &'static str {
    match icon {
        "asterisk" => "✱",
        "sparkle" => "✦",
        _ => "•",
    }
}

fn paint(text: &str, color: UsageColor) -> ColoredString {
    match color {
        UsageColor::Green => text.green(),
        UsageColor::Yellow => text.yellow(),
        UsageColor::Orange => text.truecolor(255, 165, 0),
        UsageColor::Red => text.red(),
        UsageColor::Neutral => text.dimmed(),
    }
}

/// The one-line summary, e.g. "✱ 42%". `None` means nothing is showable.
pub fn render_display_line(item: Option<&DisplayItem>, use_color: bool) -> String {
    control::set_override(use_color);
    match item {
        Some(item) => format!("{} {}", icon_glyph(item.icon), paint(&item.text, item.color)),
        None => "No usage to show".dimmed().to_string(),
    }
}

/// Render both source blocks, the current display line and any errors.
///
/// Layout:
/// ```text
///  Now  ✦ 64%
///
///  Claude (web)
///   Session  28% used [███░░░░░░░░░]
///            Resets in 2h 15m
///   Weekly   59% used [███████░░░░░]
///            Resets Tomorrow at 1:00 AM
///
///  Gemini (cli)
///   1.5-pro  64% used [████████░░░░]
///            Resets in 3h 40m
///
///  Updated 14:02:11
/// ```
pub fn render_status(state: &MonitorState, now: DateTime<Utc>, use_color: bool) -> String {
    control::set_override(use_color);

    let display = state.display(now);
    let mut sections = vec![format!(
        " {}  {}",
        "Now".bold(),
        render_display_line(display.as_ref(), use_color)
    )];

    sections.push(render_source(
        Source::Claude,
        "web",
        &state.claude,
        |usage, lines| render_web(usage, now, lines),
    ));
    sections.push(render_source(
        Source::Gemini,
        "cli",
        &state.gemini,
        |usage, lines| render_cli(usage, now, lines),
    ));

    let mut footer: Vec<String> = Vec::new();
    if let Some(error) = &state.error {
        for line in error.lines() {
            footer.push(format!(" {}", line.red()));
        }
    }
    if let Some(updated) = state.last_updated {
        let stamp = updated.with_timezone(&Local).format("%H:%M:%S").to_string();
        footer.push(format!(" {}", format!("Updated {}", stamp).dimmed()));
    }
    if !footer.is_empty() {
        sections.push(footer.join("\n"));
    }

    sections.join("\n\n")
}

fn render_source<T, F>(source: Source, mode: &str, state: &SourceState<T>, body: F) -> String
where
    T: PartialEq,
    F: FnOnce(&T, &mut Vec<String>),
{
    let header = format!(" {} ({})", source.display_name(), mode);
    let mut lines = vec![header.bold().to_string()];

    if !state.enabled {
        lines.push(format!("  {}", "Disabled".dimmed()));
    } else if !state.credentials_present {
        lines.push(format!("  {}", "Not configured".yellow()));
        lines.push(format!("  {}", source.auth_hint().dimmed()));
    } else if let Some(snapshot) = &state.snapshot {
        body(snapshot, &mut lines);
    } else {
        lines.push(format!("  {}", "No data yet".dimmed()));
    }

    lines.join("\n")
}

fn render_web(usage: &WebUsage, now: DateTime<Utc>, lines: &mut Vec<String>) {
    let reported = reported_window(usage);
    for (label, window) in [("Session", &usage.five_hour), ("Weekly", &usage.seven_day)] {
        let marker = if std::ptr::eq(window, reported) { " *" } else { "" };
        render_window(lines, label, window, now, marker);
    }
}

fn render_window(
    lines: &mut Vec<String>,
    label: &str,
    window: &UsageWindow,
    now: DateTime<Utc>,
    marker: &str,
) {
    let fraction = window.utilization / 100.0;
    push_usage_line(lines, label, fraction, marker);

    if let Some(resets_at) = &window.resets_at {
        // A weekly reset is far enough out that a date reads better
        let reset_line = if (*resets_at - now).num_hours() >= 24 {
            format_reset_datetime(resets_at)
        } else {
            reset_in(resets_at, now)
        };
        lines.push(format!("           {}", reset_line.dimmed()));
    }
}

fn render_cli(usage: &CliUsage, now: DateTime<Utc>, lines: &mut Vec<String>) {
    if usage.buckets.is_empty() {
        lines.push(format!("  {}", "No quota buckets reported".dimmed()));
        return;
    }
    let pro_id = usage.pro_bucket().map(|b| b.model_id.as_str());
    for bucket in &usage.buckets {
        let label = bucket
            .model_id
            .strip_prefix("gemini-")
            .unwrap_or(&bucket.model_id);
        let marker = if Some(bucket.model_id.as_str()) == pro_id { " *" } else { "" };
        let fraction = bucket.usage_percentage() / 100.0;
        push_usage_line(lines, label, fraction, marker);

        if fraction > 0.0 {
            if let Ok(resets_at) = bucket.parsed_reset_time() {
                lines.push(format!("           {}", reset_in(&resets_at, now).dimmed()));
            }
        }
    }
}

fn push_usage_line(lines: &mut Vec<String>, label: &str, fraction: f64, marker: &str) {
    let percent = format!("{:>4} used", format_percent(fraction));
    let bar = format_usage_bar(fraction * 100.0, BAR_WIDTH);
    lines.push(format!(
        "  {}  {} {}{}",
        format!("{:<7}", label).cyan(),
        paint(&percent, UsageColor::for_fraction(fraction)),
        bar.magenta(),
        marker
    ));
}

fn reset_in(resets_at: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    let countdown = format_countdown(resets_at, now);
    if *resets_at <= now {
        countdown
    } else {
        format!("Resets in {}", countdown)
    }
}
