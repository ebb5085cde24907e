//! Authentication error types.

use thiserror::Error;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors raised while retrieving a signing-key set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyFetchError {
    /// The HTTP client could not be constructed.
    #[error("HTTP client setup failed: {0}")]
    Client(String),

    /// The request to the JWKS endpoint failed.
    #[error("JWKS request failed: {0}")]
    Request(String),

    /// The JWKS endpoint did not answer within the configured deadline.
    #[error("JWKS request timed out")]
    Timeout,

    /// The JWKS endpoint returned a non-success status.
    #[error("JWKS endpoint returned HTTP {0}")]
    Status(u16),

    /// The JWKS document could not be parsed.
    #[error("invalid JWKS document: {0}")]
    InvalidDocument(String),
}

/// Errors raised while validating a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The token (or the header carrying it) is not well-formed.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The key ID in the token header does not match exactly one key.
    #[error("unknown signing key: {0}")]
    UnknownKey(String),

    /// The signature does not verify under the resolved key.
    #[error("invalid signature")]
    InvalidSignature,

    /// The token's `exp` is not in the future.
    #[error("token expired")]
    Expired,

    /// A standard claim (issuer, audience, `nbf`, `iat`, `exp`) is inconsistent.
    #[error("claim mismatch: {0}")]
    ClaimMismatch(String),
}

/// Errors that can occur during authentication and authorization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Signing keys could not be retrieved.
    #[error(transparent)]
    KeyFetch(#[from] KeyFetchError),

    /// The presented token failed validation.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The verified caller lacks the role required for the operation.
    #[error("access denied for role {}", .role.as_deref().unwrap_or("<none>"))]
    AccessDenied {
        /// The role carried by the caller's token, if any.
        role: Option<String>,
    },
}

impl AuthError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::KeyFetch(_) => 500,
            Self::Token(_) => 400,
            Self::AccessDenied { .. } => 403,
        }
    }
}
