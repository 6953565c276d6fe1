pub mod delivery;
pub mod escalation;
pub mod severity;

pub use delivery::{dispatch, Backend, NotificationSink, Notifier};
pub use escalation::EscalationTracker;
