use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::cli::renderer;
use crate::core::config::AppConfig;
use crate::core::display::DisplayItem;
use crate::core::monitor::{MonitorState, UsageMonitor};
use crate::core::notify::{Backend, Notifier};

#[derive(Serialize)]
struct StatusPayload<'a> {
    display: Option<DisplayItem>,
    #[serde(flatten)]
    state: &'a MonitorState,
}

/// Poll both sources once and print the result. Notifications are logged
/// rather than shown, since a one-shot run has no history to escalate from.
pub async fn run(config: &AppConfig, opts: &OutputOptions) -> Result<()> {
    let sink = Arc::new(Notifier::new(Backend::Log));
    let mut monitor = UsageMonitor::from_config(config, sink)
        .context("Failed to set up usage sources")?;

    let spinner = matches!(opts.format, OutputFormat::Text).then(|| {
        tokio::spawn(async move {
            let frames = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
            let mut i = 0usize;
            loop {
                eprint!("\r {} Fetching usage data...", frames[i % frames.len()]);
                i = i.wrapping_add(1);
                tokio::time::sleep(std::time::Duration::from_millis(80)).await;
            }
        })
    });

    monitor.poll_once().await;

    if let Some(s) = spinner {
        s.abort();
        eprint!("\r\x1b[2K");
    }

    let state = monitor.state().read().clone();
    let now = Utc::now();

    match opts.format {
        OutputFormat::Text => {
            println!("{}", renderer::render_status(&state, now, opts.use_color));
        }
        OutputFormat::Json => {
            let payload = StatusPayload {
                display: state.display(now),
                state: &state,
            };
            println!("{}", opts.to_json(&payload)?);

            if opts.verbose {
                if let Some(error) = &state.error {
                    eprintln!("{}", error);
                }
            }
        }
    }

    Ok(())
}
