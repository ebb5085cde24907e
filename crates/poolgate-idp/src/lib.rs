//! Identity provider gateway for poolgate.
//!
//! Account creation, confirmation, credential exchange and attribute updates
//! are delegated to a Cognito user pool through the [`IdentityGateway`]
//! trait. The HTTP layer only ever sees the trait, so tests and local
//! development can swap in the in-memory implementation (feature
//! `test-utils`).
//!
//! # Example
//!
//! ```no_run
//! use poolgate_idp::{CognitoConfig, CognitoGateway, IdentityGateway};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CognitoConfig {
//!     user_pool_id: "us-east-1_AbCdEf123".to_string(),
//!     app_client_id: "1example23456789".to_string(),
//!     ..CognitoConfig::default()
//! };
//! let idp = CognitoGateway::from_env(config).await;
//!
//! let tokens = idp.initiate_auth("alice", "correct horse").await?;
//! println!("token type: {:?}", tokens.token_type);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cognito;
pub mod error;
pub mod gateway;
pub mod secret;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

use std::time::Duration;

use serde::Deserialize;

pub use cognito::CognitoGateway;
pub use error::{IdpError, Result};
pub use gateway::{AuthTokens, IdentityGateway, NewAccount, UserAttribute};
pub use secret::secret_hash;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::{InMemoryIdentityGateway, Operation};

/// Configuration for the Cognito user pool.
#[derive(Clone, Deserialize)]
pub struct CognitoConfig {
    /// AWS region of the user pool.
    #[serde(default = "CognitoConfig::default_region")]
    pub region: String,
    /// User pool identifier.
    #[serde(default)]
    pub user_pool_id: String,
    /// App client identifier.
    #[serde(default)]
    pub app_client_id: String,
    /// App client secret, when the client has one.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Deadline for a single provider call, in seconds.
    #[serde(default = "CognitoConfig::default_operation_timeout")]
    pub operation_timeout_seconds: u64,
}

impl CognitoConfig {
    fn default_region() -> String {
        "us-east-1".to_string()
    }

    const fn default_operation_timeout() -> u64 {
        10
    }

    /// Get the operation timeout as a `Duration`.
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_seconds)
    }
}

impl Default for CognitoConfig {
    fn default() -> Self {
        Self {
            region: Self::default_region(),
            user_pool_id: String::new(),
            app_client_id: String::new(),
            client_secret: None,
            operation_timeout_seconds: Self::default_operation_timeout(),
        }
    }
}

impl std::fmt::Debug for CognitoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CognitoConfig")
            .field("region", &self.region)
            .field("user_pool_id", &self.user_pool_id)
            .field("app_client_id", &self.app_client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("operation_timeout_seconds", &self.operation_timeout_seconds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = CognitoConfig::default();
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.operation_timeout(), Duration::from_secs(10));
        assert!(config.client_secret.is_none());
    }

    #[test]
    fn debug_redacts_secret() {
        let config = CognitoConfig {
            client_secret: Some("hunter2".to_string()),
            ..CognitoConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
