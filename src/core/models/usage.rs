use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A reset time string that could not be parsed as RFC 3339.
#[derive(Error, Debug)]
#[error("Cannot parse reset time '{value}': {source}")]
pub struct ResetTimeParseError {
    pub value: String,
    #[source]
    pub source: chrono::ParseError,
}

/// Parse an ISO 8601 / RFC 3339 reset timestamp, with or without fractional seconds.
pub fn parse_reset_time(value: &str) -> Result<DateTime<Utc>, ResetTimeParseError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| ResetTimeParseError {
            value: value.to_string(),
            source,
        })
}

/// One time-bounded quota window (5-hour session, 7-day weekly).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageWindow {
    /// Percentage of the window consumed (0.0 - 100.0, not enforced)
    pub utilization: f64,
    /// When the window resets, if the API reported it
    pub resets_at: Option<DateTime<Utc>>,
}

impl UsageWindow {
    pub fn new(utilization: f64, resets_at: Option<DateTime<Utc>>) -> Self {
        Self {
            utilization,
            resets_at,
        }
    }
}

/// Usage reported by the Claude web API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebUsage {
    pub five_hour: UsageWindow,
    pub seven_day: UsageWindow,
}

impl WebUsage {
    /// Highest utilization across both windows, on a 0-1 scale.
    pub fn max_utilization(&self) -> f64 {
        self.five_hour.utilization.max(self.seven_day.utilization) / 100.0
    }

    /// Earliest known reset among the windows.
    pub fn soonest_reset(&self) -> Option<DateTime<Utc>> {
        [self.five_hour.resets_at, self.seven_day.resets_at]
            .into_iter()
            .flatten()
            .min()
    }
}

fn default_remaining_fraction() -> f64 {
    1.0
}

/// One per-model quota bucket from the Gemini quota API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelBucket {
    pub model_id: String,
    #[serde(default)]
    pub token_type: String,
    pub remaining_amount: Option<String>,
    /// Fraction of the quota still available (0.0 - 1.0)
    #[serde(default = "default_remaining_fraction")]
    pub remaining_fraction: f64,
    /// Raw reset timestamp as sent by the API
    #[serde(default)]
    pub reset_time: String,
}

impl ModelBucket {
    pub fn usage_percentage(&self) -> f64 {
        (1.0 - self.remaining_fraction) * 100.0
    }

    pub fn parsed_reset_time(&self) -> Result<DateTime<Utc>, ResetTimeParseError> {
        parse_reset_time(&self.reset_time)
    }

    pub fn is_pro(&self) -> bool {
        self.model_id.to_lowercase().contains("pro")
    }
}

/// Usage reported by the Gemini CLI quota API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliUsage {
    pub buckets: Vec<ModelBucket>,
    pub last_updated: DateTime<Utc>,
}

// Two fetches with identical buckets are the same usage; `last_updated`
// is stamped per fetch and would otherwise make every poll a change.
impl PartialEq for CliUsage {
    fn eq(&self, other: &Self) -> bool {
        self.buckets == other.buckets
    }
}

impl CliUsage {
    /// Highest bucket usage (0-100), or 0 with no buckets.
    pub fn max_usage_percentage(&self) -> f64 {
        if self.buckets.is_empty() {
            return 0.0;
        }
        self.buckets
            .iter()
            .map(ModelBucket::usage_percentage)
            .fold(f64::MIN, f64::max)
    }

    /// First bucket whose model id contains "pro" (case-insensitive).
    pub fn pro_bucket(&self) -> Option<&ModelBucket> {
        self.buckets.iter().find(|b| b.is_pro())
    }

    /// Reset time of the first exhausted bucket, if one exists and parses.
    pub fn exhausted_reset(&self) -> Option<DateTime<Utc>> {
        self.buckets
            .iter()
            .find(|b| b.usage_percentage() >= 100.0)
            .and_then(|b| b.parsed_reset_time().ok())
    }
}
