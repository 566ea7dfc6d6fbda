//! Configuration management for the tokenkeep daemon

use crate::{DaemonError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokenkeep_core::{ErrorContext, FailurePolicy, RefreshSchedule};
use tokenkeep_http::{SessionClient, SessionClientBuilder};
use tokenkeep_http::types::EndpointPaths;
use url::Url;

/// Environment variable prefix; `TOKENKEEP__SERVER__BASE_URL` sets `server.base_url`
pub const ENV_PREFIX: &str = "TOKENKEEP";

/// Main daemon configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Backend connection
    pub server: ServerSettings,

    /// Backend paths
    pub endpoints: EndpointPaths,

    /// Refresh loop behaviour
    pub refresh: RefreshSettings,
}

/// Backend connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Backend origin, e.g. `https://shop.example.com`
    pub base_url: String,

    /// Transport-level request timeout in seconds
    pub timeout_secs: u64,

    /// Custom user agent
    pub user_agent: Option<String>,
}

/// Refresh scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    /// Seconds subtracted from the token lifetime
    pub margin_secs: u64,

    /// Lower bound for the timer delay in seconds
    pub min_delay_secs: u64,

    /// Upper bound for each lifetime/refresh call in seconds
    pub request_timeout_secs: u64,

    /// `silent` or `redirect`
    pub on_refresh_failure: FailurePolicy,

    /// Sign-in page, relative to `server.base_url`
    pub sign_in_path: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 10,
            user_agent: None,
        }
    }
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            margin_secs: tokenkeep_core::DEFAULT_REFRESH_MARGIN.as_secs(),
            min_delay_secs: tokenkeep_core::DEFAULT_MIN_DELAY.as_secs(),
            request_timeout_secs: 10,
            on_refresh_failure: FailurePolicy::Silent,
            sign_in_path: "/api/v1/pages/sign-in/".to_string(),
        }
    }
}

impl Settings {
    /// Load defaults, then `path` if given, then `TOKENKEEP__*` environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// merged values fail [`Settings::validate`]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, Self::environment())
    }

    /// `TOKENKEEP__SECTION__KEY` variables, read from the process environment
    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    fn load_with_env(path: Option<&Path>, environment: config::Environment) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings: Self = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check values that deserialization alone cannot catch
    pub fn validate(&self) -> Result<()> {
        let base = self.base_url()?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(DaemonError::InvalidConfig(format!(
                "server.base_url must be http or https, got '{}'",
                base.scheme()
            )));
        }

        for (name, value) in [
            ("server.timeout_secs", self.server.timeout_secs),
            ("refresh.request_timeout_secs", self.refresh.request_timeout_secs),
            ("refresh.min_delay_secs", self.refresh.min_delay_secs),
        ] {
            if value == 0 {
                return Err(DaemonError::InvalidConfig(format!("{name} must be positive")));
            }
        }

        self.endpoints
            .validate()
            .map_err(DaemonError::InvalidConfig)?;
        self.sign_in_url()?;
        Ok(())
    }

    /// Parsed backend origin
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.server.base_url)
            .with_context(|| format!("server.base_url '{}'", self.server.base_url))
            .map_err(DaemonError::InvalidConfig)
    }

    /// Absolute sign-in page URL
    pub fn sign_in_url(&self) -> Result<Url> {
        self.base_url()?
            .join(&self.refresh.sign_in_path)
            .with_context(|| format!("refresh.sign_in_path '{}'", self.refresh.sign_in_path))
            .map_err(DaemonError::InvalidConfig)
    }

    /// Delay computation derived from the refresh settings
    pub fn schedule(&self) -> Result<RefreshSchedule> {
        Ok(RefreshSchedule::new(
            Duration::from_secs(self.refresh.margin_secs),
            Duration::from_secs(self.refresh.min_delay_secs),
        )?)
    }

    /// Upper bound for each scheduler network call
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh.request_timeout_secs)
    }

    /// Session client builder preloaded with the server settings
    pub fn client_builder(&self) -> SessionClientBuilder {
        let mut builder = SessionClient::builder()
            .base_url(self.server.base_url.clone())
            .timeout(Duration::from_secs(self.server.timeout_secs))
            .paths(self.endpoints.clone());
        if let Some(agent) = &self.server.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        builder
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write as TOML, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}
