//! Token verification and role authorization for poolgate.
//!
//! This crate validates bearer tokens issued by a Cognito user pool,
//! including:
//!
//! - JWKS (JSON Web Key Set) fetching and caching
//! - RSA and Ed25519 signature validation
//! - Standard claim checks and custom claim extraction
//! - Role-based authorization of privileged operations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │   Gateway        │────▶│   JwtValidator   │
//! │   (HTTP)         │     │   (trait)        │
//! └────────┬─────────┘     └────────┬─────────┘
//!          │                        │
//!          │               ┌────────▼─────────┐     ┌──────────────────┐
//!          │               │  JwksValidator   │────▶│  TokenVerifier   │
//!          │               │  (impl)          │     │  (pure)          │
//!          │               └────────┬─────────┘     └──────────────────┘
//!          │                        │
//!          │               ┌────────▼─────────┐
//!          │               │ CachedKeySet-    │
//!          │               │ Provider         │
//!          │               └────────┬─────────┘
//!          │                        │ HTTPS
//!          │               ┌────────▼─────────┐
//!          │               │   Cognito        │
//!          │               │   JWKS endpoint  │
//!          │               └──────────────────┘
//!          ▼
//! ┌──────────────────┐
//! │   RolePolicy     │
//! └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use poolgate_auth::{AuthConfig, JwksValidator, JwtValidator, RolePolicy, UPDATE_ROLE};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig {
//!     region: "us-east-1".to_string(),
//!     user_pool_id: "us-east-1_AbCdEf123".to_string(),
//!     ..AuthConfig::default()
//! };
//!
//! let validator = JwksValidator::new(&config)?;
//! let policy = RolePolicy::default();
//!
//! // In a request handler:
//! let token = "eyJraWQiOiJ...";
//! let claims = validator.validate(token).await?;
//! policy.authorize(&claims, UPDATE_ROLE).ensure_allowed()?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod jwks;
pub mod jwt;
pub mod policy;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

use std::time::Duration;

use serde::Deserialize;

pub use error::{AuthError, KeyFetchError, Result, TokenError};
pub use jwks::{CachedKeySetProvider, HttpKeySetProvider, KeySet, KeySetProvider, SigningKey};
pub use jwt::{bearer_token, ClaimSet, JwksValidator, JwtValidator, TokenVerifier, UnverifiedToken};
pub use policy::{authorize, AuthzDecision, RolePolicy, OWNER_ROLE, ROLE_CLAIM, UPDATE_ROLE};

/// Configuration for verifying tokens from a Cognito user pool.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// AWS region of the user pool (e.g., `us-east-1`).
    #[serde(default = "AuthConfig::default_region")]
    pub region: String,
    /// User pool identifier (e.g., `us-east-1_AbCdEf123`).
    #[serde(default)]
    pub user_pool_id: String,
    /// Replaces the Cognito issuer URL, for emulators and tests.
    #[serde(default)]
    pub issuer_override: Option<String>,
    /// Expected `aud`/`client_id`. Unchecked when `None`.
    #[serde(default)]
    pub audience: Option<String>,
    /// How long a fetched key set is reused, in seconds.
    #[serde(default = "AuthConfig::default_jwks_refresh")]
    pub jwks_refresh_seconds: u64,
    /// Minimum age of a cached key set before an unknown `kid` may trigger
    /// another fetch, in seconds.
    #[serde(default = "AuthConfig::default_jwks_min_refresh")]
    pub jwks_min_refresh_seconds: u64,
    /// Deadline for a single JWKS fetch, in seconds.
    #[serde(default = "AuthConfig::default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,
}

impl AuthConfig {
    fn default_region() -> String {
        "us-east-1".to_string()
    }

    const fn default_jwks_refresh() -> u64 {
        300
    }

    const fn default_jwks_min_refresh() -> u64 {
        10
    }

    const fn default_fetch_timeout() -> u64 {
        10
    }

    /// Get the expected JWT issuer.
    #[must_use]
    pub fn issuer(&self) -> String {
        match &self.issuer_override {
            Some(issuer) => issuer.trim_end_matches('/').to_string(),
            None => format!(
                "https://cognito-idp.{}.amazonaws.com/{}",
                self.region, self.user_pool_id
            ),
        }
    }

    /// Get the JWKS endpoint URL.
    #[must_use]
    pub fn jwks_url(&self) -> String {
        format!("{}/.well-known/jwks.json", self.issuer())
    }

    /// Get the JWKS fetch deadline as a `Duration`.
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            region: Self::default_region(),
            user_pool_id: String::new(),
            issuer_override: None,
            audience: None,
            jwks_refresh_seconds: Self::default_jwks_refresh(),
            jwks_min_refresh_seconds: Self::default_jwks_min_refresh(),
            fetch_timeout_seconds: Self::default_fetch_timeout(),
        }
    }
}
