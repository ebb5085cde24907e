//! Gateway application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use poolgate_auth::{JwtValidator, RolePolicy};
use poolgate_idp::IdentityGateway;

use crate::config::GatewayConfig;

/// Shared application state for the gateway.
///
/// Collaborators are built once at startup and injected here; handlers never
/// look them up globally.
pub struct GatewayState<G, V>
where
    G: IdentityGateway,
    V: JwtValidator,
{
    /// The identity provider for account operations.
    pub idp: Arc<G>,
    /// The JWT validator for bearer tokens.
    pub jwt_validator: Arc<V>,
    /// Roles required by privileged operations.
    pub policy: RolePolicy,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<G, V> GatewayState<G, V>
where
    G: IdentityGateway,
    V: JwtValidator,
{
    /// Create a new gateway state with the default role policy.
    #[must_use]
    pub fn new(idp: Arc<G>, jwt_validator: Arc<V>, config: GatewayConfig) -> Self {
        Self {
            idp,
            jwt_validator,
            policy: RolePolicy::default(),
            config,
        }
    }

    /// Replace the role policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RolePolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<G, V> Clone for GatewayState<G, V>
where
    G: IdentityGateway,
    V: JwtValidator,
{
    fn clone(&self) -> Self {
        Self {
            idp: Arc::clone(&self.idp),
            jwt_validator: Arc::clone(&self.jwt_validator),
            policy: self.policy.clone(),
            config: self.config.clone(),
        }
    }
}
