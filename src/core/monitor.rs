use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::core::auth::{gemini_credentials_path, ClaudeSession};
use crate::core::config::AppConfig;
use crate::core::display::{select_display, DisplayItem, SourceState};
use crate::core::models::usage::{CliUsage, WebUsage};
use crate::core::notify::{dispatch, EscalationTracker, NotificationSink};
use crate::core::providers::claude_web::ClaudeWebClient;
use crate::core::providers::fetch::UsageSource;
use crate::core::providers::gemini::GeminiCliClient;
use crate::core::providers::Source;

const EVENT_CAPACITY: usize = 16;

/// Everything a display or status consumer may read.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorState {
    pub claude: SourceState<WebUsage>,
    pub gemini: SourceState<CliUsage>,
    /// Source-tagged errors from the most recent cycle, one per line
    pub error: Option<String>,
    /// End of the most recent cycle
    pub last_updated: Option<DateTime<Utc>>,
}

impl MonitorState {
    pub fn new(claude_enabled: bool, gemini_enabled: bool, now: DateTime<Utc>) -> Self {
        Self {
            claude: SourceState::new(claude_enabled, now),
            gemini: SourceState::new(gemini_enabled, now),
            error: None,
            last_updated: None,
        }
    }

    /// Computed on every read; nothing is cached between cycles.
    pub fn display(&self, now: DateTime<Utc>) -> Option<DisplayItem> {
        select_display(&self.claude, &self.gemini, now)
    }
}

pub type SharedState = Arc<RwLock<MonitorState>>;

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    CycleCompleted {
        last_updated: DateTime<Utc>,
        error: Option<String>,
    },
}

async fn fetch_if_ready<S: UsageSource>(
    source: &S,
    enabled: bool,
    credentials_present: bool,
) -> Option<Result<S::Usage, S::Error>> {
    if !enabled || !credentials_present {
        return None;
    }
    Some(source.fetch().await)
}

fn record<T: PartialEq, E: std::fmt::Display>(
    state: &mut SourceState<T>,
    source: Source,
    outcome: Option<Result<T, E>>,
    now: DateTime<Utc>,
    errors: &mut Vec<String>,
) {
    match outcome {
        None => {}
        Some(Ok(usage)) => {
            if state.apply(usage, now) {
                debug!(source = source.id(), "snapshot changed");
            }
        }
        Some(Err(e)) => {
            warn!(source = source.id(), "fetch failed: {}", e);
            errors.push(format!("{}: {}", source.display_name(), e));
        }
    }
}

/// Resolves once shutdown is requested or the sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Poll scheduler: refreshes both sources on an interval, keeps the latest
/// snapshot of each, and feeds the escalation tracker.
///
/// A cycle fans out both fetches concurrently and joins them. Everything
/// after the join is synchronous, so cancelling a cycle mid-flight can only
/// drop unfinished fetches, never a half-applied update.
pub struct Monitor<W, C> {
    claude: W,
    gemini: C,
    state: SharedState,
    tracker: EscalationTracker,
    sink: Arc<dyn NotificationSink>,
    events: broadcast::Sender<MonitorEvent>,
}

impl<W, C> Monitor<W, C>
where
    W: UsageSource<Usage = WebUsage>,
    C: UsageSource<Usage = CliUsage>,
{
    pub fn new(claude: W, gemini: C, sink: Arc<dyn NotificationSink>, config: &AppConfig) -> Self {
        let state = MonitorState::new(
            config.is_enabled(Source::Claude),
            config.is_enabled(Source::Gemini),
            Utc::now(),
        );
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            claude,
            gemini,
            state: Arc::new(RwLock::new(state)),
            tracker: EscalationTracker::new(),
            sink,
            events,
        }
    }

    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    /// Run one poll cycle: fetch, reconcile, evaluate, stamp.
    pub async fn poll_once(&mut self) {
        let (claude_enabled, gemini_enabled) = {
            let mut state = self.state.write();
            state.error = None;
            (state.claude.enabled, state.gemini.enabled)
        };
        let claude_credentials = self.claude.has_credentials();
        let gemini_credentials = self.gemini.has_credentials();

        let (claude_outcome, gemini_outcome) = tokio::join!(
            fetch_if_ready(&self.claude, claude_enabled, claude_credentials),
            fetch_if_ready(&self.gemini, gemini_enabled, gemini_credentials),
        );

        let now = Utc::now();
        let mut errors = Vec::new();
        let (claude_input, gemini_input) = {
            let mut state = self.state.write();
            state.claude.credentials_present = claude_credentials;
            state.gemini.credentials_present = gemini_credentials;
            record(&mut state.claude, Source::Claude, claude_outcome, now, &mut errors);
            record(&mut state.gemini, Source::Gemini, gemini_outcome, now, &mut errors);
            state.error = (!errors.is_empty()).then(|| errors.join("\n"));

            let claude_input = state
                .claude
                .snapshot
                .as_ref()
                .filter(|_| state.claude.enabled)
                .map(|u| (u.max_utilization(), u.soonest_reset()));
            let gemini_input = state
                .gemini
                .snapshot
                .as_ref()
                .filter(|_| state.gemini.enabled)
                .map(|u| (u.max_usage_percentage() / 100.0, u.exhausted_reset()));
            (claude_input, gemini_input)
        };

        for (source, input) in [(Source::Claude, claude_input), (Source::Gemini, gemini_input)] {
            let Some((fraction, reset_time)) = input else {
                continue;
            };
            let evaluation = self.tracker.evaluate(source, fraction, reset_time);
            if !evaluation.is_silent() {
                debug!(source = source.id(), severity = ?evaluation.severity, "notification event");
            }
            dispatch(self.sink.as_ref(), &evaluation);
        }

        let finished = Utc::now();
        let error = {
            let mut state = self.state.write();
            state.last_updated = Some(finished);
            state.error.clone()
        };
        // No subscribers is fine
        let _ = self.events.send(MonitorEvent::CycleCompleted {
            last_updated: finished,
            error,
        });
    }

    /// Poll immediately, then every `interval`, until shutdown is signalled.
    /// Cycles never overlap; a cycle that overruns the interval skips ticks.
    pub async fn run_forever(mut self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = interval.as_secs(), "usage monitor started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                _ = self.poll_once() => {}
            }
        }

        info!("usage monitor stopped");
    }
}

/// The monitor wired to the real Claude web and Gemini CLI clients.
pub type UsageMonitor = Monitor<ClaudeWebClient, GeminiCliClient>;

impl UsageMonitor {
    pub fn from_config(config: &AppConfig, sink: Arc<dyn NotificationSink>) -> anyhow::Result<Self> {
        let claude = ClaudeWebClient::new(
            ClaudeSession::resolve(&config.claude),
            config.claude.endpoint.as_deref(),
        )?;
        let gemini = GeminiCliClient::new(
            gemini_credentials_path(&config.gemini),
            config.gemini.endpoint.as_deref(),
        )?;
        Ok(Self::new(claude, gemini, sink, config))
    }
}
