mod cli;
mod core;
mod logging;

use clap::{Parser, Subcommand};

use crate::core::config::AppConfig;

#[derive(Parser)]
#[command(
    name = "burnout",
    about = "Watch Claude and Gemini quota usage and get notified before you run out",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Shorthand for --format json
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll continuously, print the current usage and send notifications (default)
    Watch {
        /// Seconds between polls (minimum 10; default from config)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Log notifications instead of showing them
        #[arg(long)]
        no_notify: bool,
    },
    /// Poll both sources once and print their usage
    Status,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Generate default config file
    Init,
    /// Validate config file and report source readiness
    Check,
    /// Print the config file location
    Path,
    /// Enable a source (claude or gemini)
    Enable {
        /// Source ID to enable
        source: String,
    },
    /// Disable a source (claude or gemini)
    Disable {
        /// Source ID to disable
        source: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, config_error) = match AppConfig::load() {
        Ok(c) => (c, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    logging::init_logging(cli.verbose, &config.settings.log_level);
    if let Some(e) = config_error {
        tracing::warn!("{}; using defaults", e);
    }

    let output_opts = cli::output::OutputOptions {
        format: cli::output::parse_format(cli.json, cli.format.as_deref()),
        pretty: cli.pretty,
        use_color: cli::output::detect_color(!cli.no_color),
        verbose: cli.verbose,
    };

    match cli.command {
        None => cli::watch_cmd::run(&config, None, false, &output_opts).await?,
        Some(Commands::Watch {
            interval,
            no_notify,
        }) => cli::watch_cmd::run(&config, interval, no_notify, &output_opts).await?,
        Some(Commands::Status) => cli::status_cmd::run(&config, &output_opts).await?,
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init => cli::config_cmd::init(&output_opts)?,
            ConfigAction::Check => cli::config_cmd::check(&output_opts)?,
            ConfigAction::Path => cli::config_cmd::path(&output_opts)?,
            ConfigAction::Enable { source } => cli::config_cmd::enable(&source, &output_opts)?,
            ConfigAction::Disable { source } => cli::config_cmd::disable(&source, &output_opts)?,
        },
    }

    Ok(())
}
