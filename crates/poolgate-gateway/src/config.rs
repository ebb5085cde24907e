//! Gateway configuration types.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// What `/signup` does when account creation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignupFailurePolicy {
    /// Return the provider error without confirming.
    #[default]
    Abort,
    /// Log the failure and confirm the account anyway.
    ConfirmAnyway,
}

impl FromStr for SignupFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "confirm_anyway" => Ok(Self::ConfirmAnyway),
            other => Err(format!("unknown signup failure policy: {other}")),
        }
    }
}

impl fmt::Display for SignupFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => f.write_str("abort"),
            Self::ConfirmAnyway => f.write_str("confirm_anyway"),
        }
    }
}

/// Configuration for the gateway service.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Listen address (e.g., "0.0.0.0:8080").
    #[serde(default = "GatewayConfig::default_listen_addr")]
    pub listen_addr: String,

    /// Allowed CORS origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    #[serde(default = "GatewayConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    #[serde(default = "GatewayConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Behavior of `/signup` when the provider rejects the account.
    #[serde(default)]
    pub signup_failure_policy: SignupFailurePolicy,
}

impl GatewayConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:8080".to_string()
    }

    const fn default_max_body() -> usize {
        64 * 1024 // 64 KB
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            cors_origins: vec!["*".to_string()],
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
            signup_failure_policy: SignupFailurePolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.max_body_bytes, 64 * 1024);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.signup_failure_policy, SignupFailurePolicy::Abort);
    }

    #[test]
    fn parse_signup_policy() {
        assert_eq!("abort".parse(), Ok(SignupFailurePolicy::Abort));
        assert_eq!(
            " Confirm_Anyway ".parse(),
            Ok(SignupFailurePolicy::ConfirmAnyway)
        );
        assert!("sometimes".parse::<SignupFailurePolicy>().is_err());
        assert_eq!(SignupFailurePolicy::ConfirmAnyway.to_string(), "confirm_anyway");
    }

    #[test]
    fn deserialize_with_defaults() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"signup_failure_policy":"confirm_anyway"}"#).unwrap();
        assert_eq!(
            config.signup_failure_policy,
            SignupFailurePolicy::ConfirmAnyway
        );
        assert_eq!(config.request_timeout_seconds, 30);
        assert!(config.cors_origins.is_empty());
    }
}
