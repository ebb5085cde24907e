//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! This module handles fetching the identity provider's public signing keys
//! and caching them per JWKS URL so repeated verifications do not hit the
//! network.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::prelude::*;
use jsonwebtoken::{Algorithm, DecodingKey};
use parking_lot::RwLock;
use serde::Deserialize;

use crate::error::KeyFetchError;

/// JWKS document as published by the identity provider.
#[derive(Debug, Deserialize)]
pub struct JwksDocument {
    /// The list of keys.
    pub keys: Vec<JwkKey>,
}

/// A single JWK (JSON Web Key).
#[derive(Debug, Deserialize)]
pub struct JwkKey {
    /// Key type (`RSA` or `OKP`).
    pub kty: String,
    /// Key ID.
    pub kid: Option<String>,
    /// Key use (e.g., "sig").
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    /// Algorithm (e.g., `RS256`).
    pub alg: Option<String>,
    /// RSA modulus (base64url encoded).
    pub n: Option<String>,
    /// RSA exponent (base64url encoded).
    pub e: Option<String>,
    /// Curve (e.g., "Ed25519").
    pub crv: Option<String>,
    /// OKP public key (base64url encoded).
    pub x: Option<String>,
}

/// A public key usable for signature verification.
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    algorithm: Algorithm,
    key: DecodingKey,
}

impl SigningKey {
    /// The key identifier.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// The only algorithm this key may be used with.
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The key material.
    #[must_use]
    pub const fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// An ordered set of signing keys fetched from one JWKS URL.
///
/// Cloning is cheap; the keys are shared.
#[derive(Debug, Clone)]
pub struct KeySet {
    url: String,
    keys: Arc<[SigningKey]>,
    fetched_at: Instant,
}

impl KeySet {
    /// Build a key set from a parsed JWKS document.
    ///
    /// Keys that are not signature keys, carry no `kid`, or use an
    /// unsupported key type are skipped.
    ///
    /// # Errors
    ///
    /// Returns `KeyFetchError::InvalidDocument` if a supported key has
    /// missing or undecodable key material.
    pub fn from_document(url: impl Into<String>, document: JwksDocument) -> Result<Self, KeyFetchError> {
        let url = url.into();
        let mut keys = Vec::with_capacity(document.keys.len());

        for jwk in &document.keys {
            let Some(kid) = jwk.kid.as_deref() else {
                tracing::warn!(url = %url, kty = %jwk.kty, "Skipping JWK without kid");
                continue;
            };
            if jwk.key_use.as_deref().is_some_and(|u| u != "sig") {
                tracing::debug!(url = %url, kid = kid, "Skipping non-signature JWK");
                continue;
            }
            if let Some(key) = parse_key(kid, jwk)? {
                keys.push(key);
            }
        }

        tracing::debug!(url = %url, count = keys.len(), "Parsed JWKS keys");

        Ok(Self {
            url,
            keys: keys.into(),
            fetched_at: Instant::now(),
        })
    }

    /// Parse a key set from a raw JWKS JSON body.
    ///
    /// # Errors
    ///
    /// Returns `KeyFetchError::InvalidDocument` if the body is not a JWKS
    /// document or a key inside it is unusable.
    pub fn from_json(url: impl Into<String>, body: &[u8]) -> Result<Self, KeyFetchError> {
        let document: JwksDocument = serde_json::from_slice(body)
            .map_err(|e| KeyFetchError::InvalidDocument(e.to_string()))?;
        Self::from_document(url, document)
    }

    /// The JWKS URL this set was fetched from.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// All usable keys, in document order.
    #[must_use]
    pub fn keys(&self) -> &[SigningKey] {
        &self.keys
    }

    /// Number of usable keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set has no usable keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether any key carries this `kid`.
    #[must_use]
    pub fn contains(&self, kid: &str) -> bool {
        self.keys.iter().any(|k| k.kid == kid)
    }

    /// Resolve a `kid` to its key. Returns `None` unless exactly one key matches.
    #[must_use]
    pub fn resolve(&self, kid: &str) -> Option<&SigningKey> {
        let mut matches = self.keys.iter().filter(|k| k.kid == kid);
        let first = matches.next()?;
        if matches.next().is_some() {
            tracing::warn!(url = %self.url, kid = kid, "Ambiguous kid in JWKS");
            return None;
        }
        Some(first)
    }

    /// How long ago this set was fetched.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }
}

/// Parse a JWK into a `SigningKey`.
fn parse_key(kid: &str, key: &JwkKey) -> Result<Option<SigningKey>, KeyFetchError> {
    match key.kty.as_str() {
        "RSA" => {
            let algorithm = match key.alg.as_deref() {
                None => Algorithm::RS256,
                Some(alg) => match Algorithm::from_str(alg) {
                    Ok(
                        a @ (Algorithm::RS256
                        | Algorithm::RS384
                        | Algorithm::RS512
                        | Algorithm::PS256
                        | Algorithm::PS384
                        | Algorithm::PS512),
                    ) => a,
                    _ => {
                        tracing::warn!(kid = kid, alg = alg, "RSA key with non-RSA algorithm");
                        return Ok(None);
                    }
                },
            };

            let (Some(n), Some(e)) = (key.n.as_deref(), key.e.as_deref()) else {
                return Err(KeyFetchError::InvalidDocument(format!(
                    "RSA key {kid} is missing n or e"
                )));
            };

            let decoding_key = DecodingKey::from_rsa_components(n, e).map_err(|err| {
                KeyFetchError::InvalidDocument(format!("RSA key {kid}: {err}"))
            })?;

            Ok(Some(SigningKey {
                kid: kid.to_string(),
                algorithm,
                key: decoding_key,
            }))
        }
        "OKP" => {
            let crv = key.crv.as_deref().unwrap_or("");
            if crv != "Ed25519" {
                tracing::warn!(kid = kid, crv = crv, "Unsupported OKP curve");
                return Ok(None);
            }
            if key.alg.as_deref().is_some_and(|alg| alg != "EdDSA") {
                tracing::warn!(kid = kid, alg = ?key.alg, "OKP key with non-EdDSA algorithm");
                return Ok(None);
            }

            let x = key.x.as_ref().ok_or_else(|| {
                KeyFetchError::InvalidDocument(format!("OKP key {kid} is missing x"))
            })?;

            let public_key = BASE64_URL_SAFE_NO_PAD
                .decode(x)
                .map_err(|e| KeyFetchError::InvalidDocument(format!("invalid base64: {e}")))?;

            Ok(Some(SigningKey {
                kid: kid.to_string(),
                algorithm: Algorithm::EdDSA,
                key: DecodingKey::from_ed_der(&public_key),
            }))
        }
        other => {
            tracing::warn!(kid = kid, kty = other, "Unknown key type");
            Ok(None)
        }
    }
}

/// Source of signing-key sets.
#[async_trait]
pub trait KeySetProvider: Send + Sync {
    /// Fetch the current key set published at `jwks_url`.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, timeout, non-success status, or
    /// a malformed document.
    async fn fetch(&self, jwks_url: &str) -> Result<KeySet, KeyFetchError>;
}

/// Fetches key sets over HTTPS on every call.
#[derive(Debug, Clone)]
pub struct HttpKeySetProvider {
    client: reqwest::Client,
}

impl HttpKeySetProvider {
    /// Create a provider whose requests are bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `KeyFetchError::Client` if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, KeyFetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .build()
            .map_err(|e| KeyFetchError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    /// Create a provider with a custom reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KeySetProvider for HttpKeySetProvider {
    async fn fetch(&self, jwks_url: &str) -> Result<KeySet, KeyFetchError> {
        tracing::debug!(url = %jwks_url, "Fetching JWKS");

        let response = self.client.get(jwks_url).send().await.map_err(|e| {
            if e.is_timeout() {
                KeyFetchError::Timeout
            } else {
                KeyFetchError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %jwks_url, status = %status, "JWKS endpoint returned an error");
            return Err(KeyFetchError::Status(status.as_u16()));
        }

        let document: JwksDocument = response.json().await.map_err(|e| {
            if e.is_timeout() {
                KeyFetchError::Timeout
            } else {
                KeyFetchError::InvalidDocument(e.to_string())
            }
        })?;

        KeySet::from_document(jwks_url, document)
    }
}

/// Key-set cache in front of another provider.
///
/// Entries live for `ttl`. A cached set that lacks the requested `kid` is
/// treated as stale and re-fetched once, so key rotation is picked up
/// without a restart. Such re-fetches are skipped while the cached set is
/// younger than `min_refresh_interval`, so a stream of tokens with made-up
/// key IDs cannot drive one fetch per request.
pub struct CachedKeySetProvider<P> {
    inner: P,
    ttl: Duration,
    min_refresh_interval: Duration,
    cache: RwLock<HashMap<String, KeySet>>,
}

impl<P: KeySetProvider> CachedKeySetProvider<P> {
    /// Wrap `inner` with a cache whose entries expire after `ttl`.
    #[must_use]
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            min_refresh_interval: Duration::ZERO,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Set the minimum age a cached set must reach before an unknown `kid`
    /// may trigger another fetch for the same URL.
    #[must_use]
    pub const fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Get the key set for `jwks_url`, fetching if there is no fresh entry
    /// or the fresh entry does not contain `kid`.
    ///
    /// At most one fetch happens per call. A fresh set missing `kid` is
    /// returned as is while it is younger than the minimum refresh interval.
    ///
    /// # Errors
    ///
    /// Returns the underlying provider's error if a fetch is needed and fails.
    pub async fn key_set_for(&self, jwks_url: &str, kid: Option<&str>) -> Result<KeySet, KeyFetchError> {
        if let Some(cached) = self.cached(jwks_url) {
            match kid {
                Some(kid) if !cached.contains(kid) => {
                    if cached.age() < self.min_refresh_interval {
                        tracing::debug!(url = %jwks_url, kid = kid, "Key ID not in cached JWKS, refreshed too recently");
                        return Ok(cached);
                    }
                    tracing::info!(url = %jwks_url, kid = kid, "Key ID not in cached JWKS, refreshing");
                }
                _ => return Ok(cached),
            }
        }

        self.refresh(jwks_url).await
    }

    /// Fetch and store a new key set for `jwks_url`.
    ///
    /// # Errors
    ///
    /// Returns the underlying provider's error. The cache is left untouched on failure.
    pub async fn refresh(&self, jwks_url: &str) -> Result<KeySet, KeyFetchError> {
        let key_set = self.inner.fetch(jwks_url).await?;
        self.cache
            .write()
            .insert(jwks_url.to_string(), key_set.clone());
        Ok(key_set)
    }

    /// Drop the cached entry for `jwks_url`.
    pub fn invalidate(&self, jwks_url: &str) {
        self.cache.write().remove(jwks_url);
    }

    /// The wrapped provider.
    #[must_use]
    pub const fn inner(&self) -> &P {
        &self.inner
    }

    fn cached(&self, jwks_url: &str) -> Option<KeySet> {
        let cache = self.cache.read();
        cache
            .get(jwks_url)
            .filter(|set| set.age() < self.ttl)
            .cloned()
    }
}

#[async_trait]
impl<P: KeySetProvider> KeySetProvider for CachedKeySetProvider<P> {
    async fn fetch(&self, jwks_url: &str) -> Result<KeySet, KeyFetchError> {
        self.key_set_for(jwks_url, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, StaticKeySetProvider, ED25519_KID, PRIMARY_KID, ROTATED_KID};

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const URL: &str = "https://idp.test/pool/.well-known/jwks.json";

    fn jwk(value: serde_json::Value) -> JwkKey {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parse_ed25519_key() {
        let key = jwk(serde_json::json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo",
            "kid": "test-key",
            "use": "sig",
            "alg": "EdDSA"
        }));

        let result = parse_key("test-key", &key).unwrap().unwrap();
        assert_eq!(result.algorithm(), Algorithm::EdDSA);
    }

    #[test]
    fn skip_unsupported_curve() {
        let key = jwk(serde_json::json!({
            "kty": "OKP",
            "crv": "X25519",
            "x": "somekey",
            "kid": "test-key"
        }));

        assert!(parse_key("test-key", &key).unwrap().is_none());
    }

    #[test]
    fn rsa_key_defaults_to_rs256() {
        let key = jwk(serde_json::json!({
            "kty": "RSA",
            "kid": "k",
            "n": testing::PRIMARY_N,
            "e": "AQAB"
        }));

        let result = parse_key("k", &key).unwrap().unwrap();
        assert_eq!(result.algorithm(), Algorithm::RS256);
        assert_eq!(result.kid(), "k");
    }

    #[test]
    fn rsa_key_with_hmac_alg_is_skipped() {
        let key = jwk(serde_json::json!({
            "kty": "RSA",
            "kid": "k",
            "alg": "HS256",
            "n": testing::PRIMARY_N,
            "e": "AQAB"
        }));

        assert!(parse_key("k", &key).unwrap().is_none());
    }

    #[test]
    fn rsa_key_without_modulus_is_invalid() {
        let key = jwk(serde_json::json!({ "kty": "RSA", "kid": "k", "e": "AQAB" }));

        assert!(matches!(
            parse_key("k", &key),
            Err(KeyFetchError::InvalidDocument(_))
        ));
    }

    #[test]
    fn document_skips_keys_without_kid_or_sig_use() {
        let body = serde_json::json!({
            "keys": [
                { "kty": "RSA", "n": testing::PRIMARY_N, "e": "AQAB" },
                { "kty": "RSA", "kid": "enc", "use": "enc", "n": testing::PRIMARY_N, "e": "AQAB" },
                { "kty": "EC", "kid": "ec", "crv": "P-256" },
                { "kty": "RSA", "kid": "good", "use": "sig", "alg": "RS256", "n": testing::PRIMARY_N, "e": "AQAB" }
            ]
        });

        let set = KeySet::from_json(URL, body.to_string().as_bytes()).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.contains("good"));
        assert!(!set.contains("enc"));
    }

    #[test]
    fn malformed_document_is_rejected() {
        let result = KeySet::from_json(URL, b"{\"not_keys\": []}");
        assert!(matches!(result, Err(KeyFetchError::InvalidDocument(_))));
    }

    #[test]
    fn resolve_requires_exactly_one_match() {
        let body = serde_json::json!({
            "keys": [
                { "kty": "RSA", "kid": "dup", "n": testing::PRIMARY_N, "e": "AQAB" },
                { "kty": "RSA", "kid": "dup", "n": testing::ROTATED_N, "e": "AQAB" },
                { "kty": "RSA", "kid": "one", "n": testing::PRIMARY_N, "e": "AQAB" }
            ]
        });

        let set = KeySet::from_json(URL, body.to_string().as_bytes()).unwrap();
        assert!(set.resolve("dup").is_none());
        assert!(set.resolve("one").is_some());
        assert!(set.resolve("missing").is_none());
    }

    #[test]
    fn fixture_document_parses_every_key() {
        let set = testing::key_set(URL);
        assert_eq!(set.len(), 3);
        assert!(set.contains(PRIMARY_KID));
        assert!(set.contains(ROTATED_KID));
        assert!(set.contains(ED25519_KID));
        assert_eq!(set.url(), URL);
    }

    #[tokio::test]
    async fn http_provider_fetches_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(testing::jwks_document()))
            .expect(1)
            .mount(&server)
            .await;

        let provider = HttpKeySetProvider::new(Duration::from_secs(5)).unwrap();
        let url = format!("{}/.well-known/jwks.json", server.uri());
        let set = provider.fetch(&url).await.unwrap();

        assert_eq!(set.len(), 3);
        assert!(set.contains(PRIMARY_KID));
    }

    #[tokio::test]
    async fn http_provider_surfaces_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = HttpKeySetProvider::new(Duration::from_secs(5)).unwrap();
        let url = format!("{}/.well-known/jwks.json", server.uri());

        assert_eq!(provider.fetch(&url).await.unwrap_err(), KeyFetchError::Status(503));
    }

    #[tokio::test]
    async fn http_provider_rejects_non_jwks_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&server)
            .await;

        let provider = HttpKeySetProvider::new(Duration::from_secs(5)).unwrap();
        let url = format!("{}/.well-known/jwks.json", server.uri());

        assert!(matches!(
            provider.fetch(&url).await,
            Err(KeyFetchError::InvalidDocument(_))
        ));
    }

    #[tokio::test]
    async fn http_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(testing::jwks_document())
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let provider = HttpKeySetProvider::new(Duration::from_millis(200)).unwrap();
        let url = format!("{}/.well-known/jwks.json", server.uri());

        assert_eq!(provider.fetch(&url).await.unwrap_err(), KeyFetchError::Timeout);
    }

    #[tokio::test]
    async fn cache_serves_known_kid_without_refetch() {
        let cache = CachedKeySetProvider::new(StaticKeySetProvider::default(), Duration::from_secs(300));

        cache.key_set_for(URL, Some(PRIMARY_KID)).await.unwrap();
        cache.key_set_for(URL, Some(PRIMARY_KID)).await.unwrap();
        cache.fetch(URL).await.unwrap();

        assert_eq!(cache.inner().fetch_count(), 1);
    }

    #[tokio::test]
    async fn cache_refetches_once_on_unknown_kid() {
        let cache = CachedKeySetProvider::new(StaticKeySetProvider::default(), Duration::from_secs(300));

        cache.key_set_for(URL, Some(PRIMARY_KID)).await.unwrap();
        let set = cache.key_set_for(URL, Some("rotated-away")).await.unwrap();

        assert!(!set.contains("rotated-away"));
        assert_eq!(cache.inner().fetch_count(), 2);
    }

    #[tokio::test]
    async fn unknown_kids_within_refresh_interval_share_one_fetch() {
        let cache = CachedKeySetProvider::new(StaticKeySetProvider::default(), Duration::from_secs(300))
            .with_min_refresh_interval(Duration::from_secs(60));

        cache.key_set_for(URL, Some(PRIMARY_KID)).await.unwrap();
        for i in 0..50 {
            let kid = format!("junk-{i}");
            let set = cache.key_set_for(URL, Some(&kid)).await.unwrap();
            assert!(!set.contains(&kid));
        }

        assert_eq!(cache.inner().fetch_count(), 1);
    }

    #[tokio::test]
    async fn unknown_kid_refetches_after_refresh_interval() {
        let provider = StaticKeySetProvider::with_document(testing::jwks_document_with(&[PRIMARY_KID]));
        let cache = CachedKeySetProvider::new(provider, Duration::from_secs(300))
            .with_min_refresh_interval(Duration::from_millis(500));
        cache.key_set_for(URL, Some(PRIMARY_KID)).await.unwrap();

        cache
            .inner()
            .set_document(testing::jwks_document_with(&[ROTATED_KID]));
        let early = cache.key_set_for(URL, Some(ROTATED_KID)).await.unwrap();
        assert!(!early.contains(ROTATED_KID));

        tokio::time::sleep(Duration::from_millis(600)).await;
        let later = cache.key_set_for(URL, Some(ROTATED_KID)).await.unwrap();
        assert!(later.contains(ROTATED_KID));
        assert_eq!(cache.inner().fetch_count(), 2);
    }

    #[tokio::test]
    async fn cache_picks_up_rotated_key() {
        let provider = StaticKeySetProvider::with_document(testing::jwks_document_with(&[PRIMARY_KID]));
        let cache = CachedKeySetProvider::new(provider, Duration::from_secs(300));

        let before = cache.key_set_for(URL, Some(PRIMARY_KID)).await.unwrap();
        assert!(!before.contains(ROTATED_KID));

        cache
            .inner()
            .set_document(testing::jwks_document_with(&[ROTATED_KID]));

        let after = cache.key_set_for(URL, Some(ROTATED_KID)).await.unwrap();
        assert!(after.contains(ROTATED_KID));
        assert!(!after.contains(PRIMARY_KID));
    }

    #[tokio::test]
    async fn cache_expires_after_ttl() {
        let cache = CachedKeySetProvider::new(StaticKeySetProvider::default(), Duration::ZERO);

        cache.fetch(URL).await.unwrap();
        cache.fetch(URL).await.unwrap();

        assert_eq!(cache.inner().fetch_count(), 2);
    }

    #[tokio::test]
    async fn cache_entries_are_per_url() {
        let cache = CachedKeySetProvider::new(StaticKeySetProvider::default(), Duration::from_secs(300));

        cache.fetch(URL).await.unwrap();
        cache.fetch("https://other.test/.well-known/jwks.json").await.unwrap();
        cache.invalidate(URL);
        cache.fetch(URL).await.unwrap();

        assert_eq!(cache.inner().fetch_count(), 3);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_entry() {
        let cache = CachedKeySetProvider::new(StaticKeySetProvider::default(), Duration::from_secs(300));
        cache.fetch(URL).await.unwrap();

        cache
            .inner()
            .fail_with(Some(KeyFetchError::Status(500)));
        assert!(cache.key_set_for(URL, Some("unknown")).await.is_err());

        cache.inner().fail_with(None);
        let set = cache.key_set_for(URL, Some(PRIMARY_KID)).await.unwrap();
        assert!(set.contains(PRIMARY_KID));
        assert_eq!(cache.inner().fetch_count(), 2);
    }
}
