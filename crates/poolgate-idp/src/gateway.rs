//! The `IdentityGateway` trait and the records it exchanges.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A user attribute stored by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAttribute {
    /// Attribute name (e.g., `email`, `custom:role`).
    pub name: String,
    /// Attribute value.
    pub value: String,
}

impl UserAttribute {
    /// Create an attribute.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An account to create.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Login name.
    pub username: String,
    /// Initial password.
    pub password: String,
    /// Attributes stored with the account.
    pub attributes: Vec<UserAttribute>,
}

/// Tokens returned by a successful credential exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthTokens {
    /// Access token.
    pub access_token: Option<String>,
    /// Lifetime of the tokens, in seconds.
    pub expires_in: Option<i64>,
    /// ID token.
    pub id_token: Option<String>,
    /// Refresh token.
    pub refresh_token: Option<String>,
    /// Token type (normally `Bearer`).
    pub token_type: Option<String>,
}

/// Account operations delegated to the identity provider.
///
/// Implementations are shared across concurrent requests; each call is an
/// independent remote operation.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// Create an unconfirmed account.
    ///
    /// # Errors
    ///
    /// Returns `IdpError::SignUp` if the provider rejects the account.
    async fn sign_up(&self, account: &NewAccount) -> Result<()>;

    /// Confirm an account without a verification code.
    ///
    /// # Errors
    ///
    /// Returns `IdpError::ConfirmSignUp` if the account cannot be confirmed.
    async fn confirm_sign_up(&self, username: &str) -> Result<()>;

    /// Exchange a username and password for tokens.
    ///
    /// # Errors
    ///
    /// Returns `IdpError::Authentication` on rejected credentials and
    /// `IdpError::ChallengeRequired` when the provider wants another step.
    async fn initiate_auth(&self, username: &str, password: &str) -> Result<AuthTokens>;

    /// Overwrite attributes of an existing account.
    ///
    /// # Errors
    ///
    /// Returns `IdpError::UpdateAttributes` if the provider rejects the update.
    async fn update_attributes(&self, username: &str, attributes: &[UserAttribute]) -> Result<()>;
}
