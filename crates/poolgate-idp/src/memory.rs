//! In-memory `IdentityGateway` for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{IdpError, Result};
use crate::gateway::{AuthTokens, IdentityGateway, NewAccount, UserAttribute};

/// Operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `sign_up`
    SignUp,
    /// `confirm_sign_up`
    ConfirmSignUp,
    /// `initiate_auth`
    InitiateAuth,
    /// `update_attributes`
    UpdateAttributes,
}

#[derive(Debug, Clone)]
struct StoredUser {
    password: String,
    confirmed: bool,
    attributes: HashMap<String, String>,
}

/// Keeps accounts in a map and records every call.
#[derive(Debug, Default)]
pub struct InMemoryIdentityGateway {
    users: Mutex<HashMap<String, StoredUser>>,
    failing: Mutex<HashMap<Operation, IdpError>>,
    calls: Mutex<Vec<Operation>>,
}

impl InMemoryIdentityGateway {
    /// Create an empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a confirmed account.
    pub fn insert_user(&self, username: &str, password: &str, attributes: &[UserAttribute]) {
        self.users.lock().insert(
            username.to_string(),
            StoredUser {
                password: password.to_string(),
                confirmed: true,
                attributes: attributes
                    .iter()
                    .map(|a| (a.name.clone(), a.value.clone()))
                    .collect(),
            },
        );
    }

    /// Make every later call of `operation` fail with `error`.
    pub fn fail(&self, operation: Operation, error: IdpError) {
        self.failing.lock().insert(operation, error);
    }

    /// Operations invoked so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Operation> {
        self.calls.lock().clone()
    }

    /// Whether an account exists.
    #[must_use]
    pub fn has_user(&self, username: &str) -> bool {
        self.users.lock().contains_key(username)
    }

    /// Whether an account exists and is confirmed.
    #[must_use]
    pub fn is_confirmed(&self, username: &str) -> bool {
        self.users
            .lock()
            .get(username)
            .is_some_and(|user| user.confirmed)
    }

    /// Current value of an account attribute.
    #[must_use]
    pub fn attribute(&self, username: &str, name: &str) -> Option<String> {
        self.users
            .lock()
            .get(username)
            .and_then(|user| user.attributes.get(name).cloned())
    }

    fn record(&self, operation: Operation) -> Result<()> {
        self.calls.lock().push(operation);
        match self.failing.lock().get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IdentityGateway for InMemoryIdentityGateway {
    async fn sign_up(&self, account: &NewAccount) -> Result<()> {
        self.record(Operation::SignUp)?;

        let mut users = self.users.lock();
        if users.contains_key(&account.username) {
            return Err(IdpError::SignUp(
                "UsernameExistsException: User already exists".to_string(),
            ));
        }
        users.insert(
            account.username.clone(),
            StoredUser {
                password: account.password.clone(),
                confirmed: false,
                attributes: account
                    .attributes
                    .iter()
                    .map(|a| (a.name.clone(), a.value.clone()))
                    .collect(),
            },
        );
        Ok(())
    }

    async fn confirm_sign_up(&self, username: &str) -> Result<()> {
        self.record(Operation::ConfirmSignUp)?;

        let mut users = self.users.lock();
        let user = users.get_mut(username).ok_or_else(|| {
            IdpError::ConfirmSignUp("UserNotFoundException: User does not exist.".to_string())
        })?;
        user.confirmed = true;
        Ok(())
    }

    async fn initiate_auth(&self, username: &str, password: &str) -> Result<AuthTokens> {
        self.record(Operation::InitiateAuth)?;

        let users = self.users.lock();
        let authenticated = users
            .get(username)
            .is_some_and(|user| user.password == password);
        if !authenticated {
            return Err(IdpError::Authentication(
                "NotAuthorizedException: Incorrect username or password.".to_string(),
            ));
        }
        if !users.get(username).is_some_and(|user| user.confirmed) {
            return Err(IdpError::Authentication(
                "UserNotConfirmedException: User is not confirmed.".to_string(),
            ));
        }

        Ok(AuthTokens {
            access_token: Some(format!("access-token-{username}")),
            expires_in: Some(3600),
            id_token: Some(format!("id-token-{username}")),
            refresh_token: Some(format!("refresh-token-{username}")),
            token_type: Some("Bearer".to_string()),
        })
    }

    async fn update_attributes(&self, username: &str, attributes: &[UserAttribute]) -> Result<()> {
        self.record(Operation::UpdateAttributes)?;

        let mut users = self.users.lock();
        let user = users.get_mut(username).ok_or_else(|| {
            IdpError::UpdateAttributes("UserNotFoundException: User does not exist.".to_string())
        })?;
        for attribute in attributes {
            user.attributes
                .insert(attribute.name.clone(), attribute.value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(username: &str) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            password: "Pw1!".to_string(),
            attributes: vec![UserAttribute::new("custom:role", "member")],
        }
    }

    #[tokio::test]
    async fn sign_up_confirm_and_log_in() {
        let idp = InMemoryIdentityGateway::new();

        idp.sign_up(&account("alice")).await.unwrap();
        assert!(!idp.is_confirmed("alice"));
        assert!(idp.initiate_auth("alice", "Pw1!").await.is_err());

        idp.confirm_sign_up("alice").await.unwrap();
        let tokens = idp.initiate_auth("alice", "Pw1!").await.unwrap();

        assert_eq!(tokens.token_type.as_deref(), Some("Bearer"));
        assert_eq!(idp.attribute("alice", "custom:role").as_deref(), Some("member"));
    }

    #[tokio::test]
    async fn duplicate_sign_up_fails() {
        let idp = InMemoryIdentityGateway::new();
        idp.sign_up(&account("alice")).await.unwrap();

        assert!(matches!(
            idp.sign_up(&account("alice")).await,
            Err(IdpError::SignUp(_))
        ));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let idp = InMemoryIdentityGateway::new();
        idp.insert_user("alice", "Pw1!", &[]);

        assert!(matches!(
            idp.initiate_auth("alice", "nope").await,
            Err(IdpError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn confirm_unknown_user_fails() {
        let idp = InMemoryIdentityGateway::new();
        assert!(matches!(
            idp.confirm_sign_up("ghost").await,
            Err(IdpError::ConfirmSignUp(_))
        ));
    }

    #[tokio::test]
    async fn injected_failures_and_call_log() {
        let idp = InMemoryIdentityGateway::new();
        idp.insert_user("bob", "pw", &[]);
        idp.fail(
            Operation::UpdateAttributes,
            IdpError::UpdateAttributes("throttled".into()),
        );

        let result = idp
            .update_attributes("bob", &[UserAttribute::new("custom:role", "admin")])
            .await;

        assert_eq!(result, Err(IdpError::UpdateAttributes("throttled".into())));
        assert_eq!(idp.attribute("bob", "custom:role"), None);
        assert_eq!(idp.calls(), vec![Operation::UpdateAttributes]);
    }
}
