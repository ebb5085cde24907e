//! Error types for identity provider calls.

use thiserror::Error;

/// A result type using `IdpError`.
pub type Result<T> = std::result::Result<T, IdpError>;

/// Errors returned by an `IdentityGateway`.
///
/// Each variant carries the provider's error text unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdpError {
    /// Account creation failed.
    #[error("sign up failed: {0}")]
    SignUp(String),

    /// Account confirmation failed.
    #[error("confirm sign up failed: {0}")]
    ConfirmSignUp(String),

    /// Credential exchange failed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The provider answered with a challenge instead of tokens.
    #[error("authentication challenge required: {0}")]
    ChallengeRequired(String),

    /// Attribute update failed.
    #[error("update attributes failed: {0}")]
    UpdateAttributes(String),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
