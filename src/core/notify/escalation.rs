use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::core::notify::severity::Severity;
use crate::core::providers::Source;

const RESET_SUFFIX: &str = "reset";

/// A notification ready for delivery. Ids are stable per source and kind so
/// delivery backends replace rather than stack repeats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationEvent {
    pub id: String,
    pub title: String,
    pub body: String,
}

/// A notification to fire at a future instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledEvent {
    pub at: DateTime<Utc>,
    pub event: NotificationEvent,
}

/// Outcome of one severity evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    /// Severity to remember for the next evaluation
    pub severity: Severity,
    pub immediate: Option<NotificationEvent>,
    pub scheduled: Option<ScheduledEvent>,
    /// Id of a pending scheduled event to withdraw
    pub cancel: Option<String>,
}

impl Evaluation {
    pub fn is_silent(&self) -> bool {
        self.immediate.is_none() && self.scheduled.is_none() && self.cancel.is_none()
    }
}

pub fn reset_notification_id(source: Source) -> String {
    format!("{}-{}", source.id(), RESET_SUFFIX)
}

fn severity_notification_id(source: Source, severity: Severity) -> String {
    format!("{}-{}", source.id(), severity.id_suffix())
}

/// Compare a fresh usage fraction against the previous severity.
///
/// Events fire only on a strict escalation; dropping out of `Exhausted`
/// withdraws the pending reset notification. Reaching `Exhausted` without a
/// known reset time produces nothing.
pub fn evaluate(
    previous: Severity,
    source: Source,
    fraction: f64,
    reset_time: Option<DateTime<Utc>>,
) -> Evaluation {
    let severity = Severity::classify(fraction);
    let mut evaluation = Evaluation {
        severity,
        ..Evaluation::default()
    };

    let name = source.display_name();
    let percent = (fraction * 100.0) as i64;

    if severity > previous {
        match severity {
            Severity::Warning => {
                evaluation.immediate = Some(NotificationEvent {
                    id: severity_notification_id(source, severity),
                    title: format!("{} Quota Warning", name),
                    body: format!("You've used {}% of your quota.", percent),
                });
            }
            Severity::Critical => {
                evaluation.immediate = Some(NotificationEvent {
                    id: severity_notification_id(source, severity),
                    title: format!("{} Quota Critical", name),
                    body: format!("Approaching limit! {}% used.", percent),
                });
            }
            Severity::Exhausted => {
                evaluation.scheduled = reset_time.map(|at| ScheduledEvent {
                    at,
                    event: NotificationEvent {
                        id: reset_notification_id(source),
                        title: format!("{} Quota Reset", name),
                        body: "You're back in business! Your quota has reset.".to_string(),
                    },
                });
            }
            Severity::Normal => {}
        }
    } else if severity < previous && previous == Severity::Exhausted {
        evaluation.cancel = Some(reset_notification_id(source));
    }

    evaluation
}

/// Per-source escalation memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct EscalationTracker {
    levels: HashMap<Source, Severity>,
}

impl EscalationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn severity(&self, source: Source) -> Severity {
        self.levels.get(&source).copied().unwrap_or_default()
    }

    /// Evaluate and remember the new severity, whether or not an event resulted.
    pub fn evaluate(
        &mut self,
        source: Source,
        fraction: f64,
        reset_time: Option<DateTime<Utc>>,
    ) -> Evaluation {
        let evaluation = evaluate(self.severity(source), source, fraction, reset_time);
        self.levels.insert(source, evaluation.severity);
        evaluation
    }
}
