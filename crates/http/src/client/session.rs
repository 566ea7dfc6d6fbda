//! Session token API client methods

use super::{ClientError, SessionClient};
use crate::types::{EmptyRequest, SignInRequest, TokenLifetimeResponse};
use reqwest::Method;
use serde_json::Value as JsonValue;
use tokenkeep_core::AccessTokenLifetime;
use tracing::debug;

impl SessionClient {
    /// Fetch the current access token lifetime
    pub async fn token_lifetime(&self) -> Result<AccessTokenLifetime, ClientError> {
        let request = self.request(Method::GET, &self.paths.token_lifetime);
        let body: TokenLifetimeResponse = self.execute(request).await?;
        debug!(
            lifetime_secs = body.access_token_lifetime,
            "Fetched access token lifetime"
        );
        AccessTokenLifetime::from_secs_f64(body.access_token_lifetime)
            .map_err(ClientError::InvalidLifetime)
    }

    /// Renew the access token cookie
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let request = self
            .request(Method::POST, &self.paths.refresh)
            .json(&EmptyRequest {});
        self.execute_empty(request).await
    }

    /// Sign in; the backend answers with the session cookies
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let request = self
            .request(Method::POST, &self.paths.sign_in)
            .json(&SignInRequest {
                username: username.to_string(),
                password: password.to_string(),
            });
        self.execute_empty(request).await?;
        debug!(username, "Signed in");
        Ok(())
    }

    /// Sign out, then drop the session cookies from the jar
    ///
    /// The jar is only cleared when the backend accepts the logout.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let request = self
            .request(Method::POST, &self.paths.logout)
            .json(&EmptyRequest {});
        self.execute_empty(request).await?;
        self.clear_cookies();
        debug!("Signed out");
        Ok(())
    }

    /// Fetch the signed-in user
    ///
    /// On `401` the access token is refreshed once and the request retried
    /// once; a second `401` is returned to the caller.
    pub async fn current_user(&self) -> Result<JsonValue, ClientError> {
        let fetch = || self.request(Method::GET, &self.paths.current_user);

        match self.execute(fetch()).await {
            Err(ClientError::AuthenticationFailed(message)) => {
                debug!(%message, "Access token rejected, refreshing before retry");
                self.refresh().await?;
                self.execute(fetch()).await
            }
            other => other,
        }
    }
}
