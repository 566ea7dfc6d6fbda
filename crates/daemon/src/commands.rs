//! CLI commands

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokenkeep_core::SchedulerState;
use tokenkeep_daemon::{RefreshSchedulerBuilder, Settings, SignInHandler, StateDir};
use tokenkeep_http::SessionClient;
use tracing::{info, warn};
use url::Url;

#[derive(Subcommand)]
pub enum Commands {
    /// Keep the session alive until interrupted or a refresh fails
    Run {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Print the access token lifetime and the resulting refresh delay
    Lifetime {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Refresh the access token once
    Refresh {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Print the signed-in user
    Whoami {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Sign out and clear the session cookies
    Logout {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Generate a default configuration file
    Config {
        /// Output file path (prints to stdout when omitted)
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// How to obtain session cookies before talking to the backend
#[derive(Args)]
pub struct SessionArgs {
    /// Sign in with this username first
    #[arg(short = 'u', long)]
    username: Option<String>,

    /// Password for --username
    #[arg(long, env = "TOKENKEEP_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Seed a session cookie, e.g. refresh_token=...; repeatable
    #[arg(long = "cookie", value_name = "NAME=VALUE")]
    cookies: Vec<String>,
}

impl Commands {
    /// Commands that stay up long enough to want a log file
    pub const fn is_long_running(&self) -> bool {
        matches!(self, Self::Run { .. })
    }

    pub async fn execute(self, state_dir: &StateDir, config: Option<&Path>) -> Result<()> {
        match self {
            Self::Run { session } => {
                let settings = load_settings(state_dir, config)?;
                run(&settings, session).await
            }
            Self::Lifetime { session } => {
                let settings = load_settings(state_dir, config)?;
                let client = connect(&settings, session).await?;
                let lifetime = client.token_lifetime().await?;
                let schedule = settings.schedule()?;
                println!("Access token lifetime: {lifetime}");
                println!(
                    "Next refresh in: {}ms (raw {}ms)",
                    schedule.delay_for(lifetime).as_millis(),
                    schedule.raw_delay_millis(lifetime)
                );
                Ok(())
            }
            Self::Refresh { session } => {
                let settings = load_settings(state_dir, config)?;
                let client = connect(&settings, session).await?;
                client.refresh().await?;
                println!("Access token refreshed");
                Ok(())
            }
            Self::Whoami { session } => {
                let settings = load_settings(state_dir, config)?;
                let client = connect(&settings, session).await?;
                let user = client.current_user().await?;
                println!("{}", serde_json::to_string_pretty(&user)?);
                Ok(())
            }
            Self::Logout { session } => {
                let settings = load_settings(state_dir, config)?;
                let client = connect(&settings, session).await?;
                client.logout().await?;
                println!("Signed out");
                Ok(())
            }
            Self::Config { output, force } => {
                let settings = Settings::default();
                match output {
                    Some(path) => {
                        if path.exists() && !force {
                            bail!("{} already exists, pass --force to overwrite", path.display());
                        }
                        settings.save(&path)?;
                        println!("Configuration written to: {}", path.display());
                    }
                    None => print!("{}", settings.to_toml()?),
                }
                Ok(())
            }
        }
    }
}

/// Explicit path first, then the state directory's file if present
fn load_settings(state_dir: &StateDir, config: Option<&Path>) -> Result<Settings> {
    let path = config.map(Path::to_path_buf).or_else(|| {
        let default = state_dir.config_path();
        default.exists().then_some(default)
    });

    if let Some(path) = &path {
        info!("Loading configuration from: {}", path.display());
    }
    Settings::load(path.as_deref()).context("Failed to load configuration")
}

async fn connect(settings: &Settings, session: SessionArgs) -> Result<SessionClient> {
    let mut builder = settings.client_builder();
    for cookie in session.cookies {
        builder = builder.cookie(cookie);
    }
    let client = builder.build()?;

    if let Some(username) = session.username {
        let password = session
            .password
            .context("--password or TOKENKEEP_PASSWORD is required with --username")?;
        client
            .sign_in(&username, &password)
            .await
            .context("Sign-in failed")?;
        info!(%username, "Signed in");
    }

    Ok(client)
}

async fn run(settings: &Settings, session: SessionArgs) -> Result<()> {
    let client = connect(settings, session).await?;
    if !client.has_cookies() {
        warn!("No session cookies; pass --username or --cookie unless the backend needs none");
    }

    let scheduler = RefreshSchedulerBuilder::from_settings(settings, Arc::new(client))?
        .sign_in_handler(Arc::new(PrintSignInUrl))
        .start()?;

    println!("Keeping session alive at {}", settings.server.base_url);

    let state = tokio::select! {
        state = scheduler.wait_terminal() => state,
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Received shutdown signal");
            scheduler.shutdown().await
        }
    };

    match state {
        SchedulerState::Failed(cause) => bail!("Refresh scheduler failed: {cause}"),
        state => {
            info!(%state, "Refresh scheduler finished");
            Ok(())
        }
    }
}

/// Tells the user where to sign in again
struct PrintSignInUrl;

impl SignInHandler for PrintSignInUrl {
    fn sign_in_required(&self, sign_in_url: &Url) {
        warn!(url = %sign_in_url, "Session expired");
        println!("Session expired, sign in again at {sign_in_url}");
    }
}
