use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::formatter::{format_countdown, format_percent, WAITING_TEXT};
use crate::core::models::usage::{CliUsage, UsageWindow, WebUsage};
use crate::core::providers::Source;

/// Above this weekly utilization the weekly window is reported instead of the session one.
const SECONDARY_WINDOW_THRESHOLD: f64 = 95.0;

pub const NOT_APPLICABLE_TEXT: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageColor {
    Green,
    Yellow,
    Orange,
    Red,
    /// No usable number to tier
    Neutral,
}

impl UsageColor {
    /// Tier a 0-1 usage fraction: [0,0.5) green, [0.5,0.8) yellow, [0.8,1) orange, else red.
    pub fn for_fraction(fraction: f64) -> Self {
        if fraction < 0.5 {
            Self::Green
        } else if fraction < 0.8 {
            Self::Yellow
        } else if fraction < 1.0 {
            Self::Orange
        } else {
            Self::Red
        }
    }
}

/// The one (icon, text, color) summary shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayItem {
    pub source: Source,
    pub icon: &'static str,
    pub text: String,
    pub color: UsageColor,
}

/// Latest known state of one source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceState<T> {
    pub snapshot: Option<T>,
    /// Last time a fetch produced a value different from the previous snapshot
    pub last_changed_at: DateTime<Utc>,
    pub enabled: bool,
    pub credentials_present: bool,
}

impl<T: PartialEq> SourceState<T> {
    pub fn new(enabled: bool, created_at: DateTime<Utc>) -> Self {
        Self {
            snapshot: None,
            last_changed_at: created_at,
            enabled,
            credentials_present: false,
        }
    }

    /// Snapshot, if this source may be displayed at all.
    pub fn showable(&self) -> Option<&T> {
        if self.enabled && self.credentials_present {
            self.snapshot.as_ref()
        } else {
            None
        }
    }

    /// Store a freshly fetched value. Returns true when it differs from the
    /// held snapshot; an identical value leaves `last_changed_at` untouched.
    pub fn apply(&mut self, fetched: T, now: DateTime<Utc>) -> bool {
        if self.snapshot.as_ref() == Some(&fetched) {
            return false;
        }
        self.snapshot = Some(fetched);
        self.last_changed_at = now;
        true
    }
}

fn web_is_active(usage: &WebUsage) -> bool {
    usage.five_hour.utilization > 0.0
}

fn cli_is_active(usage: &CliUsage) -> bool {
    usage.max_usage_percentage() > 0.0
}

/// The window reported for Claude: weekly once it is nearly spent, else session.
pub fn reported_window(usage: &WebUsage) -> &UsageWindow {
    if usage.seven_day.utilization > SECONDARY_WINDOW_THRESHOLD {
        &usage.seven_day
    } else {
        &usage.five_hour
    }
}

pub fn web_display_item(usage: &WebUsage, now: DateTime<Utc>) -> DisplayItem {
    let window = reported_window(usage);
    let fraction = window.utilization / 100.0;

    let (text, color) = match window.resets_at {
        Some(resets_at) if window.utilization >= 100.0 => {
            (format_countdown(&resets_at, now), UsageColor::Red)
        }
        _ => (format_percent(fraction), UsageColor::for_fraction(fraction)),
    };

    DisplayItem {
        source: Source::Claude,
        icon: Source::Claude.icon(),
        text,
        color,
    }
}

pub fn cli_display_item(usage: &CliUsage, now: DateTime<Utc>) -> DisplayItem {
    let Some(bucket) = usage.pro_bucket() else {
        return DisplayItem {
            source: Source::Gemini,
            icon: Source::Gemini.icon(),
            text: NOT_APPLICABLE_TEXT.to_string(),
            color: UsageColor::Neutral,
        };
    };

    let percentage = bucket.usage_percentage();
    let fraction = percentage / 100.0;
    let text = if percentage >= 100.0 {
        match bucket.parsed_reset_time() {
            Ok(resets_at) => format_countdown(&resets_at, now),
            Err(_) => WAITING_TEXT.to_string(),
        }
    } else {
        format_percent(fraction)
    };

    DisplayItem {
        source: Source::Gemini,
        icon: Source::Gemini.icon(),
        text,
        color: UsageColor::for_fraction(fraction),
    }
}

/// Pick what to display right now, or `None` when neither source is showable.
///
/// Selection order:
/// 1. Only sources that are enabled, credentialed and hold a snapshot count.
/// 2. With two candidates, a source with live usage beats an idle one.
/// 3. Otherwise the source whose snapshot changed most recently wins,
///    Claude taking exact ties.
pub fn select_display(
    claude: &SourceState<WebUsage>,
    gemini: &SourceState<CliUsage>,
    now: DateTime<Utc>,
) -> Option<DisplayItem> {
    match (claude.showable(), gemini.showable()) {
        (None, None) => None,
        (Some(web), None) => Some(web_display_item(web, now)),
        (None, Some(cli)) => Some(cli_display_item(cli, now)),
        (Some(web), Some(cli)) => {
            let prefer_claude = match (web_is_active(web), cli_is_active(cli)) {
                (true, false) => true,
                (false, true) => false,
                _ => claude.last_changed_at >= gemini.last_changed_at,
            };
            if prefer_claude {
                Some(web_display_item(web, now))
            } else {
                Some(cli_display_item(cli, now))
            }
        }
    }
}
