use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::cli::renderer;
use crate::core::config::{AppConfig, MIN_POLL_INTERVAL_SECS};
use crate::core::display::DisplayItem;
use crate::core::monitor::{MonitorEvent, SharedState, UsageMonitor};
use crate::core::notify::{Backend, Notifier};

/// One line of `watch --json` output per completed cycle.
#[derive(Serialize)]
struct CyclePayload {
    last_updated: DateTime<Utc>,
    display: Option<DisplayItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn resolve_interval(config: &AppConfig, override_secs: Option<u64>) -> Duration {
    match override_secs {
        Some(secs) => Duration::from_secs(secs.max(MIN_POLL_INTERVAL_SECS)),
        None => config.poll_interval(),
    }
}

fn notification_backend(config: &AppConfig, no_notify: bool) -> Backend {
    if no_notify || !config.settings.notifications {
        Backend::Log
    } else {
        Backend::Desktop
    }
}

fn print_cycle(
    state: &SharedState,
    last_updated: DateTime<Utc>,
    error: Option<String>,
    opts: &OutputOptions,
) -> Result<()> {
    let display = state.read().display(Utc::now());
    match opts.format {
        OutputFormat::Text => {
            let stamp = last_updated.with_timezone(&Local).format("%H:%M:%S");
            println!(
                "[{}] {}",
                stamp,
                renderer::render_display_line(display.as_ref(), opts.use_color)
            );
            if let Some(error) = error {
                for line in error.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
        OutputFormat::Json => {
            // One object per line regardless of --pretty
            let payload = CyclePayload {
                last_updated,
                display,
                error,
            };
            println!("{}", serde_json::to_string(&payload)?);
        }
    }
    Ok(())
}

/// Poll until interrupted, printing the display line after every cycle and
/// delivering escalation notifications as usage climbs.
pub async fn run(
    config: &AppConfig,
    interval_secs: Option<u64>,
    no_notify: bool,
    opts: &OutputOptions,
) -> Result<()> {
    let backend = notification_backend(config, no_notify);
    let sink = Arc::new(Notifier::new(backend));
    let monitor = UsageMonitor::from_config(config, sink)
        .context("Failed to set up usage sources")?;
    let state = monitor.state();
    let mut events = monitor.subscribe();
    let interval = resolve_interval(config, interval_secs);

    info!(?backend, "watching usage");
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(monitor.run_forever(interval, shutdown_rx));

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(MonitorEvent::CycleCompleted { last_updated, error }) => {
                    print_cycle(&state, last_updated, error, opts)?;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "display fell behind monitor cycles");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                let _ = shutdown_tx.send(true);
                break;
            }
        }
    }

    handle.await?;
    Ok(())
}
