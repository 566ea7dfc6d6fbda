//! tokenkeep core types and utilities

pub mod endpoint;
pub mod error;
pub mod policy;
pub mod schedule;
pub mod state;
pub mod types;

#[cfg(any(test, feature = "tests"))]
pub mod tests;

#[cfg(feature = "tracing")]
pub mod tracing;

pub use endpoint::TokenEndpoint;
pub use error::{CoreError, CoreResult, ErrorContext};
pub use policy::FailurePolicy;
pub use schedule::{DEFAULT_MIN_DELAY, DEFAULT_REFRESH_MARGIN, RefreshSchedule};
pub use state::{FailureCause, SchedulerState};
pub use types::AccessTokenLifetime;
