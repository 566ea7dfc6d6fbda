use crate::{AccessTokenLifetime, CoreResult};
use async_trait::async_trait;

/// Backend operations the refresh scheduler depends on
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Current lifetime of a freshly issued access token
    async fn access_token_lifetime(&self) -> CoreResult<AccessTokenLifetime>;

    /// Ask the backend to renew the session credential
    async fn refresh(&self) -> CoreResult<()>;
}

// Mock implementation for testing
#[cfg(any(test, feature = "tests"))]
pub mod mock {
    use super::*;
    use mockall::mock;

    mock! {
        pub TokenEndpoint {}

        #[async_trait]
        impl TokenEndpoint for TokenEndpoint {
            async fn access_token_lifetime(&self) -> CoreResult<AccessTokenLifetime>;
            async fn refresh(&self) -> CoreResult<()>;
        }
    }
}
