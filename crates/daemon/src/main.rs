//! tokenkeep - keeps a cookie session alive by refreshing its access token

mod commands;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use std::path::PathBuf;
use tokenkeep_core::tracing::{InstrumentationConfig, init_tracing};
use tokenkeep_daemon::StateDir;
use tracing::{Level, error, info};

#[derive(Parser)]
#[command(name = "tokenkeep")]
#[command(about = "Keeps a cookie-based session alive by refreshing its access token")]
#[command(version)]
struct Cli {
    /// Set logging level (RUST_LOG takes precedence)
    #[arg(short = 'l', long, global = true, default_value = "info")]
    log_level: LogLevel,

    /// Configuration file (defaults to tokenkeep.toml in the config directory)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Data directory for configuration and logs
    #[arg(short = 'd', long, global = true, env = "TOKENKEEP_STATE_DIR")]
    data_dir: Option<PathBuf>,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let state_dir = cli
        .data_dir
        .clone()
        .map_or_else(StateDir::new, StateDir::with_override);

    let mut instrumentation = InstrumentationConfig::from_env();
    if std::env::var_os("RUST_LOG").is_none() {
        instrumentation.log_level = Level::from(cli.log_level).to_string().to_lowercase();
    }
    if !cli.no_file_log && cli.command.is_long_running() {
        state_dir.create_directories()?;
        instrumentation = instrumentation.with_log_file(state_dir.log_path());
    }
    init_tracing(&instrumentation)?;

    info!("Starting tokenkeep");

    if let Err(e) = cli.command.execute(&state_dir, cli.config.as_deref()).await {
        error!("Command failed: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}
