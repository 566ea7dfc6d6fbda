//! tokenkeep HTTP client for the cookie-session token API
//!
//! [`client::SessionClient`] talks to the backend's token lifetime, refresh,
//! sign-in, logout and user endpoints, keeping the session cookies in its own
//! jar. It implements [`tokenkeep_core::TokenEndpoint`] so the refresh
//! scheduler can drive it.

pub mod client;
pub mod types;

pub use client::{SessionClient, SessionClientBuilder, error::ClientError};
