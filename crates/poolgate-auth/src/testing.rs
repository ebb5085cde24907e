//! Fixtures for exercising verification without a live identity provider.
//!
//! Provides fixed signing keys with their matching JWKS document, a token
//! signer, and an in-process `KeySetProvider` that counts fetches.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::error::KeyFetchError;
use crate::jwks::{KeySet, KeySetProvider};

/// Key ID of the primary RSA test key.
pub const PRIMARY_KID: &str = "test-rsa-primary";
/// Key ID of the second RSA test key.
pub const ROTATED_KID: &str = "test-rsa-rotated";
/// Key ID of the Ed25519 test key.
pub const ED25519_KID: &str = "test-ed25519";

/// Modulus of the primary RSA test key (base64url).
pub const PRIMARY_N: &str = "1A32hllO8-ShDZs_SS6eCuXr7SzehphOpExWZEcL4KTxSwMtrdSRfsclwnJi4TuUo5AZyJvCXB3oQMJi-7sq4VVbDD6wyCOd_X8y8pO6H_CbPfRXtQMLmWx41Hgk80HFyc6cUowhDaoL8pwE3QUespp-1FiNL6iYxs0-b_LgVy6YO_jTuGYAbBkPhLYnfD3pqobDXjJTTFK26A7pptSbHkZXaGOpVDjETqqn0uXS-ht33cJJaut4AV-bRYGTNoOEiJcrjbEs7MAxwyirsKpq8cL6--JQeFLaENwRSXU7s2UgMLJ_C1R8sl2tOvFrDMkIHjj5a8kMVisJLkLTu6fGHQ";
/// Modulus of the rotated RSA test key (base64url).
pub const ROTATED_N: &str = "ncwSwFzDJP1JqajpfpnuYUd2wwPWP2LBHQuBm6WUv5un4laa-e-O_W3qwBElVXZLaDFjAMv8wdIy1IpZGltlFzo3XbhHePzSRO5Cv8MF7mzUxWycKORAK48A-AEjqAINEaNiP2StpJh1OwK9xIHXnY_Wf5gruqIz9RvNg4Cq4z52kzbBakzXr363VytzsV-ANEpw7Tu9FUSVRktW0LVb0VBpsshVGzC7tXlmPREgZDXQMu3mp7bwX8yqKwecO-bw9ybnmRWaIkBDyNouOE05ZgnBvr7hlm0Q9HJLQbxd4SQPVtVTEYdStsLKsjLvBGHQ9nc4e61_jRXe0vbeGRT5MQ";
/// Public half of the Ed25519 test key (base64url).
pub const ED25519_X: &str = "2Hb2PK2XDpQBZETifFfTPIbh8JmFmqYoltERch2i8gc";

const PRIMARY_PEM: &str = include_str!("../testdata/rsa-primary.pem");
const ROTATED_PEM: &str = include_str!("../testdata/rsa-rotated.pem");
const ED25519_PEM: &str = include_str!("../testdata/ed25519.pem");

/// Issuer used by the fixtures.
pub const TEST_ISSUER: &str = "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_TestPool";

/// Signs tokens with one of the fixture keys.
pub struct TestSigner {
    kid: String,
    algorithm: Algorithm,
    key: EncodingKey,
}

impl TestSigner {
    /// Signer for the primary RSA key (`RS256`).
    ///
    /// # Panics
    ///
    /// Panics if the embedded PEM is unreadable.
    #[must_use]
    pub fn primary() -> Self {
        Self::rsa(PRIMARY_KID, PRIMARY_PEM)
    }

    /// Signer for the rotated RSA key (`RS256`).
    ///
    /// # Panics
    ///
    /// Panics if the embedded PEM is unreadable.
    #[must_use]
    pub fn rotated() -> Self {
        Self::rsa(ROTATED_KID, ROTATED_PEM)
    }

    /// Signer for the Ed25519 key (`EdDSA`).
    ///
    /// # Panics
    ///
    /// Panics if the embedded PEM is unreadable.
    #[must_use]
    pub fn ed25519() -> Self {
        Self {
            kid: ED25519_KID.to_string(),
            algorithm: Algorithm::EdDSA,
            key: EncodingKey::from_ed_pem(ED25519_PEM.as_bytes()).expect("fixture Ed25519 key"),
        }
    }

    fn rsa(kid: &str, pem: &str) -> Self {
        Self {
            kid: kid.to_string(),
            algorithm: Algorithm::RS256,
            key: EncodingKey::from_rsa_pem(pem.as_bytes()).expect("fixture RSA key"),
        }
    }

    /// Replace the `kid` written into token headers.
    #[must_use]
    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = kid.into();
        self
    }

    /// Sign `claims` into a compact JWT.
    ///
    /// # Panics
    ///
    /// Panics if signing fails.
    #[must_use]
    pub fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(self.algorithm);
        header.kid = Some(self.kid.clone());
        encode(&header, claims, &self.key).expect("fixture signing")
    }
}

/// Claims shaped like a Cognito ID token, valid for one hour.
#[must_use]
pub fn id_token_claims(username: &str, role: Option<&str>) -> Value {
    let now = Utc::now();
    let mut claims = json!({
        "sub": format!("sub-{username}"),
        "iss": TEST_ISSUER,
        "aud": "test-client",
        "token_use": "id",
        "cognito:username": username,
        "email": format!("{username}@example.com"),
        "iat": now.timestamp(),
        "auth_time": now.timestamp(),
        "exp": (now + Duration::hours(1)).timestamp(),
    });
    if let Some(role) = role {
        claims["custom:role"] = json!(role);
    }
    claims
}

/// JWKS document publishing every fixture key.
#[must_use]
pub fn jwks_document() -> Value {
    jwks_document_with(&[PRIMARY_KID, ROTATED_KID, ED25519_KID])
}

/// JWKS document publishing only the named fixture keys.
#[must_use]
pub fn jwks_document_with(kids: &[&str]) -> Value {
    let keys: Vec<Value> = kids
        .iter()
        .filter_map(|kid| match *kid {
            PRIMARY_KID => Some(rsa_jwk(PRIMARY_KID, PRIMARY_N)),
            ROTATED_KID => Some(rsa_jwk(ROTATED_KID, ROTATED_N)),
            ED25519_KID => Some(json!({
                "kty": "OKP",
                "crv": "Ed25519",
                "kid": ED25519_KID,
                "use": "sig",
                "alg": "EdDSA",
                "x": ED25519_X,
            })),
            _ => None,
        })
        .collect();
    json!({ "keys": keys })
}

fn rsa_jwk(kid: &str, n: &str) -> Value {
    json!({ "kty": "RSA", "kid": kid, "use": "sig", "alg": "RS256", "n": n, "e": "AQAB" })
}

/// Key set built from [`jwks_document`].
///
/// # Panics
///
/// Panics if the fixture document fails to parse.
#[must_use]
pub fn key_set(url: &str) -> KeySet {
    KeySet::from_json(url, jwks_document().to_string().as_bytes()).expect("fixture JWKS")
}

/// In-process `KeySetProvider` serving a swappable document.
pub struct StaticKeySetProvider {
    document: Mutex<Value>,
    failure: Mutex<Option<KeyFetchError>>,
    fetches: AtomicUsize,
}

impl StaticKeySetProvider {
    /// Serve `document` on every fetch.
    #[must_use]
    pub fn with_document(document: Value) -> Self {
        Self {
            document: Mutex::new(document),
            failure: Mutex::new(None),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Replace the served document, simulating key rotation.
    pub fn set_document(&self, document: Value) {
        *self.document.lock() = document;
    }

    /// Make subsequent fetches fail with `error` (or succeed again with `None`).
    pub fn fail_with(&self, error: Option<KeyFetchError>) {
        *self.failure.lock() = error;
    }

    /// Number of fetches attempted so far, failed ones included.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Default for StaticKeySetProvider {
    fn default() -> Self {
        Self::with_document(jwks_document())
    }
}

#[async_trait]
impl KeySetProvider for StaticKeySetProvider {
    async fn fetch(&self, jwks_url: &str) -> Result<KeySet, KeyFetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        let body = self.document.lock().to_string();
        KeySet::from_json(jwks_url, body.as_bytes())
    }
}
