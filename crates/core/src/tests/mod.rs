//! Test doubles for code built on [`TokenEndpoint`](crate::TokenEndpoint)

mod endpoint;

pub use endpoint::ScriptedEndpoint;
