//! Wire types for the session token API

use serde::{Deserialize, Serialize};

/// Body of the token lifetime endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenLifetimeResponse {
    /// Seconds; the backend sends a float (`900.0`)
    pub access_token_lifetime: f64,
}

/// Empty JSON object `{}`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EmptyRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

/// Backend paths, relative to the base URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointPaths {
    pub token_lifetime: String,
    pub refresh: String,
    pub sign_in: String,
    pub logout: String,
    pub current_user: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            token_lifetime: "/api/v1/ums/token-lifetime/".to_string(),
            refresh: "/api/v1/ums/refresh/".to_string(),
            sign_in: "/api/v1/ums/login/".to_string(),
            logout: "/api/v1/ums/logout/".to_string(),
            current_user: "/api/v1/ums/users/".to_string(),
        }
    }
}

impl EndpointPaths {
    /// Every path must start with `/`; they are appended to the base URL as is
    pub fn validate(&self) -> Result<(), String> {
        for (name, path) in [
            ("token_lifetime", &self.token_lifetime),
            ("refresh", &self.refresh),
            ("sign_in", &self.sign_in),
            ("logout", &self.logout),
            ("current_user", &self.current_user),
        ] {
            if !path.starts_with('/') {
                return Err(format!("endpoints.{name} must start with '/', got '{path}'"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_request_is_empty_object() {
        assert_eq!(serde_json::to_string(&EmptyRequest {}).unwrap(), "{}");
    }

    #[test]
    fn test_lifetime_response_accepts_integer() {
        let body: TokenLifetimeResponse =
            serde_json::from_str(r#"{"access_token_lifetime": 900}"#).unwrap();
        assert!((body.access_token_lifetime - 900.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_paths_keep_defaults() {
        let paths: EndpointPaths = serde_json::from_str(r#"{"refresh": "/auth/refresh"}"#).unwrap();
        assert_eq!(paths.refresh, "/auth/refresh");
        assert_eq!(paths.token_lifetime, "/api/v1/ums/token-lifetime/");
    }

    #[test]
    fn test_paths_must_be_absolute() {
        EndpointPaths::default().validate().unwrap();

        let paths = EndpointPaths {
            logout: "api/v1/ums/logout/".to_string(),
            ..EndpointPaths::default()
        };
        let err = paths.validate().unwrap_err();
        assert!(err.contains("endpoints.logout"));
    }
}
