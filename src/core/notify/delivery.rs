use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::notify::escalation::Evaluation;

const APP_NAME: &str = "burnout";

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("desktop notification failed: {0}")]
    Desktop(#[from] notify_rust::error::Error),
    #[error("notification task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("no async runtime to deliver on")]
    NoRuntime,
}

/// Notification delivery contract. Every call is fire-and-forget: failures
/// are logged by the implementation and never reported back.
pub trait NotificationSink: Send + Sync {
    fn deliver_immediate(&self, id: &str, title: &str, body: &str);
    fn schedule_at(&self, id: &str, at: DateTime<Utc>, title: &str, body: &str);
    fn cancel(&self, id: &str);
}

/// Hand an evaluation's events to a sink. Cancellation goes first so a
/// replacement scheduled in the same evaluation is never withdrawn.
pub fn dispatch(sink: &dyn NotificationSink, evaluation: &Evaluation) {
    if let Some(id) = &evaluation.cancel {
        sink.cancel(id);
    }
    if let Some(event) = &evaluation.immediate {
        sink.deliver_immediate(&event.id, &event.title, &event.body);
    }
    if let Some(scheduled) = &evaluation.scheduled {
        let event = &scheduled.event;
        sink.schedule_at(&event.id, scheduled.at, &event.title, &event.body);
    }
}

/// Where notifications end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Native notification center (D-Bus on Linux, Notification Center on macOS)
    Desktop,
    /// Log only (notifications disabled, or one-shot commands)
    Log,
}

fn desktop_notification(title: &str, body: &str) -> notify_rust::Notification {
    let mut notification = notify_rust::Notification::new();
    notification.appname(APP_NAME).summary(title).body(body);
    notification
}

impl Backend {
    async fn show(self, id: &str, title: &str, body: &str) -> Result<(), DeliveryError> {
        match self {
            Backend::Log => {
                info!(id, title, body, "notification");
                Ok(())
            }
            Backend::Desktop => {
                let notification = desktop_notification(title, body);
                // show() blocks on the platform notification service
                tokio::task::spawn_blocking(move || notification.show().map(|_| ())).await??;
                Ok(())
            }
        }
    }
}

type PendingMap = HashMap<String, (u64, JoinHandle<()>)>;

/// Delivers notifications on the tokio runtime and keeps at most one pending
/// scheduled notification per id.
pub struct Notifier {
    backend: Backend,
    pending: Arc<Mutex<PendingMap>>,
    next_generation: AtomicU64,
}

impl Notifier {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Ids of scheduled notifications that have not fired yet.
    #[cfg(test)]
    pub fn pending_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.pending.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn spawn<F>(&self, id: &str, task: F) -> Option<JoinHandle<()>>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => Some(handle.spawn(task)),
            Err(_) => {
                warn!(id, "Dropping notification: {}", DeliveryError::NoRuntime);
                None
            }
        }
    }
}

async fn show_logged(backend: Backend, id: String, title: String, body: String) {
    if let Err(e) = backend.show(&id, &title, &body).await {
        warn!(id = %id, "Failed to deliver notification: {}", e);
    }
}

impl NotificationSink for Notifier {
    fn deliver_immediate(&self, id: &str, title: &str, body: &str) {
        debug!(id, "delivering notification");
        self.spawn(
            id,
            show_logged(self.backend, id.to_string(), title.to_string(), body.to_string()),
        );
    }

    fn schedule_at(&self, id: &str, at: DateTime<Utc>, title: &str, body: &str) {
        let delay = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        let backend = self.backend;
        let pending = Arc::clone(&self.pending);
        let (id_owned, title, body) = (id.to_string(), title.to_string(), body.to_string());
        let task = async move {
            tokio::time::sleep(delay).await;
            show_logged(backend, id_owned.clone(), title, body).await;
            let mut pending = pending.lock();
            if matches!(pending.get(&id_owned), Some((g, _)) if *g == generation) {
                pending.remove(&id_owned);
            }
        };

        // Hold the lock across spawn + insert so a zero-delay task cannot
        // look for its entry before it exists.
        let mut pending = self.pending.lock();
        if let Some((_, previous)) = pending.remove(id) {
            previous.abort();
        }
        if let Some(handle) = self.spawn(id, task) {
            info!(id, %at, "Scheduled notification");
            pending.insert(id.to_string(), (generation, handle));
        }
    }

    fn cancel(&self, id: &str) {
        if let Some((_, handle)) = self.pending.lock().remove(id) {
            handle.abort();
            info!(id, "Cancelled scheduled notification");
        }
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        for (_, (_, handle)) in self.pending.lock().drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::notify::escalation::{NotificationEvent, ScheduledEvent};
    use crate::core::notify::severity::Severity;

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<String>>,
    }

    impl NotificationSink for RecordingSink {
        fn deliver_immediate(&self, id: &str, _title: &str, _body: &str) {
            self.calls.lock().push(format!("immediate:{}", id));
        }
        fn schedule_at(&self, id: &str, _at: DateTime<Utc>, _title: &str, _body: &str) {
            self.calls.lock().push(format!("schedule:{}", id));
        }
        fn cancel(&self, id: &str) {
            self.calls.lock().push(format!("cancel:{}", id));
        }
    }

    fn event(id: &str) -> NotificationEvent {
        NotificationEvent {
            id: id.to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
        }
    }

    #[test]
    fn dispatch_routes_each_part() {
        let sink = RecordingSink::default();
        let evaluation = Evaluation {
            severity: Severity::Exhausted,
            immediate: Some(event("claude-warning")),
            scheduled: Some(ScheduledEvent {
                at: Utc::now(),
                event: event("claude-reset"),
            }),
            cancel: Some("gemini-reset".to_string()),
        };
        dispatch(&sink, &evaluation);
        assert_eq!(
            *sink.calls.lock(),
            vec![
                "cancel:gemini-reset",
                "immediate:claude-warning",
                "schedule:claude-reset"
            ]
        );
    }

    #[test]
    fn dispatch_silent_evaluation_does_nothing() {
        let sink = RecordingSink::default();
        dispatch(&sink, &Evaluation::default());
        assert!(sink.calls.lock().is_empty());
    }

    #[test]
    fn desktop_notification_carries_event_text() {
        let notification = desktop_notification(
            "Claude Quota Warning",
            "You've used 87% of your quota.",
        );
        assert_eq!(notification.appname, "burnout");
        assert_eq!(notification.summary, "Claude Quota Warning");
        assert_eq!(notification.body, "You've used 87% of your quota.");
    }

    #[test]
    fn no_runtime_drops_quietly() {
        let notifier = Notifier::new(Backend::Log);
        notifier.deliver_immediate("claude-warning", "t", "b");
        notifier.schedule_at("claude-reset", Utc::now(), "t", "b");
        assert!(notifier.pending_ids().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_notification_fires_and_clears() {
        let notifier = Notifier::new(Backend::Log);
        notifier.schedule_at(
            "claude-reset",
            Utc::now() + chrono::Duration::minutes(5),
            "Claude Quota Reset",
            "back",
        );
        assert_eq!(notifier.pending_ids(), vec!["claude-reset"]);

        tokio::time::sleep(Duration::from_secs(301)).await;
        tokio::task::yield_now().await;
        assert!(notifier.pending_ids().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_withdraws_pending() {
        let notifier = Notifier::new(Backend::Log);
        notifier.schedule_at(
            "gemini-reset",
            Utc::now() + chrono::Duration::hours(1),
            "t",
            "b",
        );
        notifier.cancel("gemini-reset");
        assert!(notifier.pending_ids().is_empty());
        // Cancelling an unknown id is a no-op
        notifier.cancel("gemini-reset");
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_pending() {
        let notifier = Notifier::new(Backend::Log);
        let later = Utc::now() + chrono::Duration::hours(2);
        notifier.schedule_at("claude-reset", later, "t", "b");
        notifier.schedule_at("claude-reset", later, "t", "b");
        assert_eq!(notifier.pending_ids(), vec!["claude-reset"]);
    }

    #[tokio::test]
    async fn past_time_fires_immediately() {
        let notifier = Notifier::new(Backend::Log);
        notifier.schedule_at(
            "claude-reset",
            Utc::now() - chrono::Duration::minutes(1),
            "t",
            "b",
        );
        for _ in 0..50 {
            if notifier.pending_ids().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(notifier.pending_ids().is_empty());
    }
}
