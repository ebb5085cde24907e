//! JWT validation and claims extraction.
//!
//! This module provides the core JWT validation logic, including signature
//! verification and claims validation.

use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::*;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Header, Validation};
use serde_json::{Map, Value};

use crate::error::{Result, TokenError};
use crate::jwks::{CachedKeySetProvider, HttpKeySetProvider, KeySet, KeySetProvider};
use crate::policy::ROLE_CLAIM;
use crate::AuthConfig;

/// Claims extracted from a token that passed verification.
///
/// There is no public constructor: the only way to obtain a `ClaimSet` is
/// [`TokenVerifier::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimSet {
    claims: Map<String, Value>,
}

impl ClaimSet {
    pub(crate) fn verified(claims: Map<String, Value>) -> Self {
        Self { claims }
    }

    /// Look up a claim by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// Look up a string claim by name.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.claims.get(name).and_then(Value::as_str)
    }

    /// The `sub` claim.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.get_str("sub")
    }

    /// The caller's username: `cognito:username` (ID tokens), then
    /// `username` (access tokens), then `sub`.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.get_str("cognito:username")
            .or_else(|| self.get_str("username"))
            .or_else(|| self.subject())
    }

    /// The `custom:role` claim. Non-string values count as no role.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.get_str(ROLE_CLAIM)
    }

    /// When the token expires.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        numeric_date(&self.claims, "exp").and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    /// All claims.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// Consume the set, returning all claims.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.claims
    }
}

/// A structurally valid token whose signature has not been checked.
#[derive(Debug, Clone)]
pub struct UnverifiedToken {
    header: Header,
    claims: Map<String, Value>,
}

impl UnverifiedToken {
    /// Split and decode a compact JWT without verifying it.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Malformed` unless the token has three non-empty
    /// base64url segments, a header with a supported `alg`, and a JSON
    /// object payload.
    pub fn parse(token: &str) -> std::result::Result<Self, TokenError> {
        let segments: Vec<&str> = token.split('.').collect();
        let [_, payload, signature] = segments.as_slice() else {
            return Err(TokenError::Malformed(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        };
        if segments.iter().any(|s| s.is_empty()) {
            return Err(TokenError::Malformed("empty segment".to_string()));
        }

        let header =
            decode_header(token).map_err(|e| TokenError::Malformed(format!("header: {e}")))?;

        let payload = BASE64_URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| TokenError::Malformed(format!("payload: {e}")))?;
        let claims: Map<String, Value> = serde_json::from_slice(&payload)
            .map_err(|e| TokenError::Malformed(format!("payload: {e}")))?;

        BASE64_URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| TokenError::Malformed(format!("signature: {e}")))?;

        Ok(Self { header, claims })
    }

    /// The decoded header.
    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// The header's key ID.
    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        self.header.kid.as_deref()
    }
}

/// Validates tokens against a key set.
///
/// Checks run in a fixed order: structure, key resolution, expiry,
/// signature, then issuer/audience/`nbf`/`iat`. The first failure wins.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    issuer: String,
    audience: Option<String>,
}

impl TokenVerifier {
    /// Create a verifier expecting tokens from `issuer`.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: None,
        }
    }

    /// Also require `aud` (ID tokens) or `client_id` (access tokens) to equal `audience`.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// The expected issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Validate `token` against `key_set` as of `now`.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as a `TokenError`.
    pub fn validate(
        &self,
        token: &str,
        key_set: &KeySet,
        now: DateTime<Utc>,
    ) -> std::result::Result<ClaimSet, TokenError> {
        let unverified = UnverifiedToken::parse(token)?;

        let kid = unverified
            .kid()
            .ok_or_else(|| TokenError::UnknownKey("token header has no kid".to_string()))?;
        let key = key_set
            .resolve(kid)
            .ok_or_else(|| TokenError::UnknownKey(kid.to_string()))?;

        let now_secs = now.timestamp();
        let exp = numeric_date(&unverified.claims, "exp")
            .ok_or_else(|| TokenError::ClaimMismatch("missing or invalid exp".to_string()))?;
        if exp <= now_secs {
            return Err(TokenError::Expired);
        }

        if unverified.header.alg != key.algorithm() {
            tracing::debug!(
                kid = kid,
                token_alg = ?unverified.header.alg,
                key_alg = ?key.algorithm(),
                "Token algorithm does not match key"
            );
            return Err(TokenError::InvalidSignature);
        }

        // Time-based checks are done below against `now`, not the wall clock.
        let mut validation = Validation::new(key.algorithm());
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<Map<String, Value>>(token, key.decoding_key(), &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                    TokenError::Malformed(e.to_string())
                }
                _ => TokenError::InvalidSignature,
            })?;
        let claims = token_data.claims;

        self.check_claims(&claims, now_secs)?;

        Ok(ClaimSet::verified(claims))
    }

    fn check_claims(
        &self,
        claims: &Map<String, Value>,
        now: i64,
    ) -> std::result::Result<(), TokenError> {
        match claims.get("iss").and_then(Value::as_str) {
            Some(iss) if iss == self.issuer => {}
            Some(iss) => {
                return Err(TokenError::ClaimMismatch(format!("unexpected issuer {iss}")));
            }
            None => return Err(TokenError::ClaimMismatch("missing iss".to_string())),
        }

        if let Some(nbf) = optional_numeric_date(claims, "nbf")? {
            if nbf > now {
                return Err(TokenError::ClaimMismatch("token not yet valid".to_string()));
            }
        }

        if let Some(iat) = optional_numeric_date(claims, "iat")? {
            if iat > now {
                return Err(TokenError::ClaimMismatch("issued in the future".to_string()));
            }
        }

        if let Some(expected) = &self.audience {
            let aud_matches = match claims.get("aud") {
                Some(Value::String(aud)) => aud == expected,
                Some(Value::Array(auds)) => auds.iter().any(|a| a.as_str() == Some(expected.as_str())),
                _ => false,
            };
            let client_matches = claims.get("client_id").and_then(Value::as_str) == Some(expected.as_str());
            if !aud_matches && !client_matches {
                return Err(TokenError::ClaimMismatch("audience mismatch".to_string()));
            }
        }

        Ok(())
    }
}

#[allow(clippy::cast_possible_truncation)]
fn numeric_date(claims: &Map<String, Value>, name: &str) -> Option<i64> {
    let value = claims.get(name)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}

fn optional_numeric_date(
    claims: &Map<String, Value>,
    name: &str,
) -> std::result::Result<Option<i64>, TokenError> {
    if !claims.contains_key(name) {
        return Ok(None);
    }
    numeric_date(claims, name)
        .map(Some)
        .ok_or_else(|| TokenError::ClaimMismatch(format!("invalid {name}")))
}

/// Extract the token from an `Authorization` header value.
///
/// The value must be exactly two space-separated parts: the `Bearer`
/// scheme (any case) and a non-empty token.
///
/// # Errors
///
/// Returns `TokenError::Malformed` for a missing header or any other shape.
pub fn bearer_token(header: Option<&str>) -> std::result::Result<&str, TokenError> {
    let header =
        header.ok_or_else(|| TokenError::Malformed("missing authorization header".to_string()))?;

    let parts: Vec<&str> = header.split(' ').collect();
    match parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => Ok(*token),
        _ => Err(TokenError::Malformed(
            "authorization header must be 'Bearer <token>'".to_string(),
        )),
    }
}

/// Trait for validating JWTs.
#[async_trait]
pub trait JwtValidator: Send + Sync {
    /// Validate a JWT and extract claims.
    ///
    /// # Errors
    ///
    /// Returns an error if signing keys cannot be fetched or the token is
    /// invalid or expired.
    async fn validate(&self, token: &str) -> Result<ClaimSet>;
}

/// JWKS-based JWT validator.
///
/// Resolves the issuer's key set through a cache, then runs the
/// [`TokenVerifier`] against it.
pub struct JwksValidator<P = HttpKeySetProvider> {
    jwks_url: String,
    keys: CachedKeySetProvider<P>,
    verifier: TokenVerifier,
}

impl JwksValidator<HttpKeySetProvider> {
    /// Create a validator that fetches keys over HTTPS.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let provider = HttpKeySetProvider::new(config.fetch_timeout())?;
        Ok(Self::with_provider(config, provider))
    }
}

impl<P: KeySetProvider> JwksValidator<P> {
    /// Create a validator backed by a custom key-set provider.
    #[must_use]
    pub fn with_provider(config: &AuthConfig, provider: P) -> Self {
        let mut verifier = TokenVerifier::new(config.issuer());
        if let Some(audience) = &config.audience {
            verifier = verifier.with_audience(audience.clone());
        }

        Self {
            jwks_url: config.jwks_url(),
            keys: CachedKeySetProvider::new(
                provider,
                Duration::from_secs(config.jwks_refresh_seconds),
            )
            .with_min_refresh_interval(Duration::from_secs(config.jwks_min_refresh_seconds)),
            verifier,
        }
    }

    /// Get a reference to the key cache for manual operations.
    #[must_use]
    pub const fn keys(&self) -> &CachedKeySetProvider<P> {
        &self.keys
    }

    /// The JWKS URL keys are fetched from.
    #[must_use]
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }
}

#[async_trait]
impl<P: KeySetProvider> JwtValidator for JwksValidator<P> {
    async fn validate(&self, token: &str) -> Result<ClaimSet> {
        // Structural problems are reported before any network traffic.
        let unverified = UnverifiedToken::parse(token)?;

        let key_set = self.keys.key_set_for(&self.jwks_url, unverified.kid()).await?;
        let claims = self.verifier.validate(token, &key_set, Utc::now())?;

        tracing::debug!(
            username = claims.username().unwrap_or("<unknown>"),
            role = claims.role().unwrap_or("<none>"),
            "Token verified"
        );

        Ok(claims)
    }
}
