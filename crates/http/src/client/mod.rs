//! Session-cookie HTTP client

pub mod endpoint;
pub mod error;
pub mod session;

use crate::types::EndpointPaths;
use error::ClientError;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, ClientBuilder, Url, header};
use std::sync::Arc;
use std::time::Duration;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the backend's session token API
///
/// Every request shares one cookie jar, so cookies set by sign-in or refresh
/// responses are sent back on later calls.
#[derive(Clone)]
pub struct SessionClient {
    client: Client,
    base_url: String,
    cookie_url: Url,
    jar: Arc<Jar>,
    paths: EndpointPaths,
}

impl SessionClient {
    /// Create a new client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> SessionClientBuilder {
        SessionClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the endpoint paths
    pub fn paths(&self) -> &EndpointPaths {
        &self.paths
    }

    /// Whether the jar holds any cookie for the backend
    pub fn has_cookies(&self) -> bool {
        self.jar.cookies(&self.cookie_url).is_some()
    }

    /// Expire every cookie the jar would send to the backend
    pub(crate) fn clear_cookies(&self) {
        let Some(header) = self.jar.cookies(&self.cookie_url) else {
            return;
        };
        let Ok(header) = header.to_str() else {
            return;
        };
        for pair in header.split(';') {
            if let Some((name, _)) = pair.trim().split_once('=') {
                self.jar
                    .add_cookie_str(&format!("{name}=; Max-Age=0"), &self.cookie_url);
            }
        }
    }

    /// Create a request builder carrying the JSON content type
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, url)
            .header(header::CONTENT_TYPE, "application/json")
    }

    /// Execute a request and decode the JSON body
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Execute a request whose body is irrelevant (e.g. `204 No Content`)
    pub async fn execute_empty(&self, request: reqwest::RequestBuilder) -> Result<(), ClientError> {
        Self::check(request.send().await?).await?;
        Ok(())
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            Err(ClientError::from_status(status, message))
        }
    }
}

/// Builder for SessionClient
#[derive(Default)]
pub struct SessionClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    paths: Option<EndpointPaths>,
    cookies: Vec<String>,
}

impl SessionClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout (defaults to [`DEFAULT_TIMEOUT`])
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Override the endpoint paths
    pub fn paths(mut self, paths: EndpointPaths) -> Self {
        self.paths = Some(paths);
        self
    }

    /// Seed the jar with a `name=value` cookie for the base URL
    pub fn cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookies.push(cookie.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<SessionClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();
        let cookie_url = Url::parse(&base_url).map_err(|e| {
            ClientError::Configuration(format!("invalid base_url '{base_url}': {e}"))
        })?;

        let paths = self.paths.unwrap_or_default();
        paths.validate().map_err(ClientError::Configuration)?;

        let jar = Arc::new(Jar::default());
        for cookie in &self.cookies {
            if !cookie.contains('=') {
                return Err(ClientError::Configuration(format!(
                    "cookie '{cookie}' is not in name=value form"
                )));
            }
            jar.add_cookie_str(cookie, &cookie_url);
        }

        let client = ClientBuilder::new()
            .cookie_provider(jar.clone())
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .user_agent(
                self.user_agent
                    .unwrap_or_else(|| concat!("tokenkeep/", env!("CARGO_PKG_VERSION")).into()),
            )
            .build()?;

        Ok(SessionClient {
            client,
            base_url,
            cookie_url,
            jar,
            paths,
        })
    }
}
