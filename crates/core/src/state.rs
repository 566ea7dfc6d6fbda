//! Refresh scheduler lifecycle states

use crate::AccessTokenLifetime;
use std::fmt;
use std::time::Duration;

/// Which step of the cycle failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// Fetching the access token lifetime failed
    LifetimeFetch(String),
    /// The refresh request itself failed
    Refresh(String),
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LifetimeFetch(reason) => write!(f, "lifetime fetch failed: {reason}"),
            Self::Refresh(reason) => write!(f, "refresh failed: {reason}"),
        }
    }
}

/// Refresh scheduler state
///
/// `Idle -> Scheduled -> Refreshing -> Scheduled ...` on the happy path.
/// `Failed` and `Stopped` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerState {
    /// Not started yet
    Idle,
    /// Timer armed; `cycle` counts completed refreshes
    Scheduled {
        delay: Duration,
        lifetime: AccessTokenLifetime,
        cycle: u64,
    },
    /// Refresh request in flight
    Refreshing { cycle: u64 },
    /// Gave up; nothing else will be armed
    Failed(FailureCause),
    /// Shut down explicitly
    Stopped,
}

impl SchedulerState {
    /// No further transitions will happen
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Stopped)
    }

    /// Number of refreshes completed so far, when known
    #[must_use]
    pub const fn completed_cycles(&self) -> Option<u64> {
        match self {
            Self::Scheduled { cycle, .. } | Self::Refreshing { cycle } => Some(*cycle),
            _ => None,
        }
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Scheduled { delay, .. } => write!(f, "scheduled in {}ms", delay.as_millis()),
            Self::Refreshing { .. } => f.write_str("refreshing"),
            Self::Failed(cause) => write!(f, "failed ({cause})"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!SchedulerState::Idle.is_terminal());
        assert!(!SchedulerState::Refreshing { cycle: 0 }.is_terminal());
        assert!(SchedulerState::Stopped.is_terminal());
        assert!(SchedulerState::Failed(FailureCause::Refresh("401".into())).is_terminal());
    }

    #[test]
    fn test_display() {
        let state = SchedulerState::Scheduled {
            delay: Duration::from_secs(600),
            lifetime: AccessTokenLifetime::from_secs(900).unwrap(),
            cycle: 2,
        };
        assert_eq!(state.to_string(), "scheduled in 600000ms");
        assert_eq!(state.completed_cycles(), Some(2));
        assert_eq!(
            SchedulerState::Failed(FailureCause::LifetimeFetch("timeout".into())).to_string(),
            "failed (lifetime fetch failed: timeout)"
        );
    }
}
