//! Refresh scheduler seam

use super::SessionClient;
use async_trait::async_trait;
use tokenkeep_core::{AccessTokenLifetime, CoreResult, TokenEndpoint};

#[async_trait]
impl TokenEndpoint for SessionClient {
    async fn access_token_lifetime(&self) -> CoreResult<AccessTokenLifetime> {
        Ok(self.token_lifetime().await?)
    }

    async fn refresh(&self) -> CoreResult<()> {
        Ok(Self::refresh(self).await?)
    }
}
