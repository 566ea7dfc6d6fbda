use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How long a freshly issued access token stays valid
///
/// The backend reports the lifetime as a JSON number of seconds, which may be
/// fractional (`900.0`). Only finite, strictly positive values are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct AccessTokenLifetime(Duration);

impl AccessTokenLifetime {
    /// Build a lifetime from whole seconds
    pub fn from_secs(secs: u64) -> CoreResult<Self> {
        if secs == 0 {
            return Err(CoreError::invalid_lifetime("lifetime must be positive"));
        }
        Ok(Self(Duration::from_secs(secs)))
    }

    /// Build a lifetime from a possibly fractional number of seconds
    pub fn from_secs_f64(secs: f64) -> CoreResult<Self> {
        if !secs.is_finite() {
            return Err(CoreError::invalid_lifetime(format!(
                "lifetime must be finite, got {secs}"
            )));
        }
        if secs <= 0.0 {
            return Err(CoreError::invalid_lifetime(format!(
                "lifetime must be positive, got {secs}"
            )));
        }
        Duration::try_from_secs_f64(secs)
            .map(Self)
            .map_err(|e| CoreError::invalid_lifetime(format!("{secs}: {e}")))
    }

    /// Lifetime as a duration
    #[must_use]
    pub const fn as_duration(&self) -> Duration {
        self.0
    }

    /// Lifetime in whole milliseconds, rounded to nearest
    #[must_use]
    pub fn as_millis_rounded(&self) -> u64 {
        // float-to-int `as` saturates
        (self.0.as_secs_f64() * 1000.0).round() as u64
    }
}

impl TryFrom<f64> for AccessTokenLifetime {
    type Error = CoreError;

    fn try_from(secs: f64) -> Result<Self, Self::Error> {
        Self::from_secs_f64(secs)
    }
}

impl From<AccessTokenLifetime> for f64 {
    fn from(lifetime: AccessTokenLifetime) -> Self {
        lifetime.0.as_secs_f64()
    }
}

impl fmt::Display for AccessTokenLifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_secs_rejects_zero() {
        assert!(matches!(
            AccessTokenLifetime::from_secs(0),
            Err(CoreError::InvalidLifetime { .. })
        ));
    }

    #[test]
    fn test_from_secs_f64_rejects_bad_values() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(
                AccessTokenLifetime::from_secs_f64(bad).is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_fractional_seconds_round_to_millis() {
        let lifetime = AccessTokenLifetime::from_secs_f64(900.0004).unwrap();
        assert_eq!(lifetime.as_millis_rounded(), 900_000);

        let lifetime = AccessTokenLifetime::from_secs_f64(0.0016).unwrap();
        assert_eq!(lifetime.as_millis_rounded(), 2);
    }

    #[test]
    fn test_deserialize_from_json_number() {
        let lifetime: AccessTokenLifetime = serde_json::from_str("900.0").unwrap();
        assert_eq!(lifetime.as_duration(), Duration::from_secs(900));

        let err = serde_json::from_str::<AccessTokenLifetime>("-5").unwrap_err();
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn test_display() {
        let lifetime = AccessTokenLifetime::from_secs(300).unwrap();
        assert_eq!(lifetime.to_string(), "300s");
    }
}
