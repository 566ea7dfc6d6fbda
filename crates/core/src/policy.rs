//! What happens after a refresh attempt fails

use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reaction to a failed refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log and let the session expire on its own
    #[default]
    Silent,
    /// Log and send the user to the sign-in page
    Redirect,
}

impl FailurePolicy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Silent => "silent",
            Self::Redirect => "redirect",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FailurePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "silent" => Ok(Self::Silent),
            "redirect" => Ok(Self::Redirect),
            other => Err(CoreError::invalid_config(format!(
                "unknown refresh failure policy '{other}', expected 'silent' or 'redirect'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("silent".parse::<FailurePolicy>().unwrap(), FailurePolicy::Silent);
        assert_eq!(
            " Redirect ".parse::<FailurePolicy>().unwrap(),
            FailurePolicy::Redirect
        );
        assert!("retry".parse::<FailurePolicy>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&FailurePolicy::Redirect).unwrap(),
            "\"redirect\""
        );
        let policy: FailurePolicy = serde_json::from_str("\"silent\"").unwrap();
        assert_eq!(policy, FailurePolicy::Silent);
    }

    #[test]
    fn test_default_is_silent() {
        assert_eq!(FailurePolicy::default(), FailurePolicy::Silent);
    }
}
