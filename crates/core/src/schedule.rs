//! Refresh delay computation

use crate::{AccessTokenLifetime, CoreError, CoreResult};
use std::time::Duration;

/// Safety margin subtracted from the token lifetime
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(300);

/// Smallest delay ever handed to the timer
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(5);

/// Turns an access token lifetime into the delay before the next refresh
///
/// The raw delay is `lifetime - margin` in milliseconds. When that is below
/// `min_delay` (including zero and negative values for lifetimes shorter than
/// the margin) the delay is clamped to `min_delay`, so the timer never sees a
/// non-positive value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSchedule {
    margin: Duration,
    min_delay: Duration,
}

impl RefreshSchedule {
    /// Create a schedule, rejecting a zero minimum delay
    pub fn new(margin: Duration, min_delay: Duration) -> CoreResult<Self> {
        if min_delay.is_zero() {
            return Err(CoreError::invalid_config(
                "minimum refresh delay must be positive",
            ));
        }
        Ok(Self { margin, min_delay })
    }

    #[must_use]
    pub const fn margin(&self) -> Duration {
        self.margin
    }

    #[must_use]
    pub const fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Unclamped delay in milliseconds; negative when the lifetime is shorter than the margin
    #[must_use]
    pub fn raw_delay_millis(&self, lifetime: AccessTokenLifetime) -> i128 {
        i128::from(lifetime.as_millis_rounded()) - self.margin.as_millis() as i128
    }

    /// Delay to arm the timer with
    #[must_use]
    pub fn delay_for(&self, lifetime: AccessTokenLifetime) -> Duration {
        let raw = self.raw_delay_millis(lifetime);
        let min = self.min_delay.as_millis() as i128;
        if raw < min {
            self.min_delay
        } else {
            Duration::from_millis(u64::try_from(raw).unwrap_or(u64::MAX))
        }
    }
}

impl Default for RefreshSchedule {
    fn default() -> Self {
        Self {
            margin: DEFAULT_REFRESH_MARGIN,
            min_delay: DEFAULT_MIN_DELAY,
        }
    }
}
