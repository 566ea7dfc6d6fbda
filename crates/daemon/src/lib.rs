//! tokenkeep daemon: keeps a cookie session alive by refreshing its access token

pub mod config;
pub mod error;
pub mod services;
pub mod state_dir;

pub use config::{RefreshSettings, ServerSettings, Settings};
pub use error::{DaemonError, Result};
pub use services::{RefreshScheduler, RefreshSchedulerBuilder, SignInHandler};
pub use state_dir::StateDir;
