use serde::Serialize;

pub const WARNING_THRESHOLD: f64 = 0.80;
pub const CRITICAL_THRESHOLD: f64 = 0.95;
pub const EXHAUSTED_THRESHOLD: f64 = 1.0;

/// Ordered escalation level derived from a 0-1 usage fraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Normal = 0,
    Warning = 1,
    Critical = 2,
    Exhausted = 3,
}

impl Severity {
    pub fn classify(fraction: f64) -> Self {
        if fraction >= EXHAUSTED_THRESHOLD {
            Self::Exhausted
        } else if fraction >= CRITICAL_THRESHOLD {
            Self::Critical
        } else if fraction >= WARNING_THRESHOLD {
            Self::Warning
        } else {
            Self::Normal
        }
    }

    /// Suffix used in notification ids, e.g. "claude-warning".
    pub fn id_suffix(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Exhausted => "exhausted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_boundaries() {
        assert_eq!(Severity::classify(0.0), Severity::Normal);
        assert_eq!(Severity::classify(0.7999), Severity::Normal);
        assert_eq!(Severity::classify(0.80), Severity::Warning);
        assert_eq!(Severity::classify(0.9499), Severity::Warning);
        assert_eq!(Severity::classify(0.95), Severity::Critical);
        assert_eq!(Severity::classify(0.9999), Severity::Critical);
        assert_eq!(Severity::classify(1.0), Severity::Exhausted);
        assert_eq!(Severity::classify(1.3), Severity::Exhausted);
    }

    #[test]
    fn classify_sweep_is_monotonic() {
        let mut previous = Severity::Normal;
        for step in 0..=120 {
            let fraction = step as f64 / 100.0;
            let severity = Severity::classify(fraction);
            assert!(severity >= previous, "dropped at {}", fraction);
            let expected = if fraction < 0.8 {
                Severity::Normal
            } else if fraction < 0.95 {
                Severity::Warning
            } else if fraction < 1.0 {
                Severity::Critical
            } else {
                Severity::Exhausted
            };
            assert_eq!(severity, expected, "at {}", fraction);
            previous = severity;
        }
    }

    #[test]
    fn negative_and_nan_are_normal() {
        assert_eq!(Severity::classify(-0.5), Severity::Normal);
        assert_eq!(Severity::classify(f64::NAN), Severity::Normal);
    }

    #[test]
    fn ordering() {
        assert!(Severity::Normal < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
        assert!(Severity::Critical < Severity::Exhausted);
        assert_eq!(Severity::default(), Severity::Normal);
    }
}
