pub mod refresh;

pub use refresh::{RefreshScheduler, RefreshSchedulerBuilder, SignInHandler};
