//! Role-based authorization over verified claims.
//!
//! Decisions are fail-closed: anything other than an exact role match denies.

use std::collections::HashMap;

use crate::error::AuthError;
use crate::jwt::ClaimSet;

/// Claim carrying the caller's role.
pub const ROLE_CLAIM: &str = "custom:role";

/// Role allowed to change other users' roles.
pub const OWNER_ROLE: &str = "owner";

/// Operation name for changing a user's role attribute.
pub const UPDATE_ROLE: &str = "update_role";

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthzDecision {
    allowed: bool,
    role: Option<String>,
}

impl AuthzDecision {
    /// Whether the operation may proceed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// The caller's role that produced this decision, if the token carried one.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// Convert a deny into `AuthError::AccessDenied`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AccessDenied` when the decision is a deny.
    pub fn ensure_allowed(self) -> Result<(), AuthError> {
        if self.allowed {
            Ok(())
        } else {
            Err(AuthError::AccessDenied { role: self.role })
        }
    }
}

/// Allow iff the `custom:role` claim is exactly `required_role`.
///
/// An empty `required_role` never allows.
#[must_use]
pub fn authorize(claims: &ClaimSet, required_role: &str) -> AuthzDecision {
    let role = claims.role();
    let allowed = !required_role.is_empty() && role == Some(required_role);

    AuthzDecision {
        allowed,
        role: role.map(str::to_string),
    }
}

/// Maps privileged operations to the role each one requires.
#[derive(Debug, Clone)]
pub struct RolePolicy {
    rules: HashMap<String, String>,
}

impl RolePolicy {
    /// A policy with no rules; every operation is denied.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Require `role` for `operation`, replacing any earlier rule.
    #[must_use]
    pub fn with_rule(mut self, operation: impl Into<String>, role: impl Into<String>) -> Self {
        self.rules.insert(operation.into(), role.into());
        self
    }

    /// The role required for `operation`, if the policy knows it.
    #[must_use]
    pub fn required_role(&self, operation: &str) -> Option<&str> {
        self.rules.get(operation).map(String::as_str)
    }

    /// Authorize `operation` for the holder of `claims`. Unknown operations deny.
    #[must_use]
    pub fn authorize(&self, claims: &ClaimSet, operation: &str) -> AuthzDecision {
        match self.required_role(operation) {
            Some(required) => authorize(claims, required),
            None => {
                tracing::warn!(operation = operation, "No role rule for operation, denying");
                AuthzDecision {
                    allowed: false,
                    role: claims.role().map(str::to_string),
                }
            }
        }
    }
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self::empty().with_rule(UPDATE_ROLE, OWNER_ROLE)
    }
}
