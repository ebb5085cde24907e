//! Cognito user pool implementation of `IdentityGateway`.
//!
//! Every call carries the configured operation timeout and is attempted
//! exactly once.

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cognitoidentityprovider::error::DisplayErrorContext;
use aws_sdk_cognitoidentityprovider::types::{AttributeType, AuthFlowType};
use aws_sdk_cognitoidentityprovider::Client;

use crate::error::{IdpError, Result};
use crate::gateway::{AuthTokens, IdentityGateway, NewAccount, UserAttribute};
use crate::secret::secret_hash;
use crate::CognitoConfig;

/// `IdentityGateway` backed by the AWS SDK.
#[derive(Debug, Clone)]
pub struct CognitoGateway {
    client: Client,
    config: CognitoConfig,
}

impl CognitoGateway {
    /// Build a gateway from the ambient AWS credential chain.
    pub async fn from_env(config: CognitoConfig) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(config.operation_timeout())
                    .build(),
            )
            .retry_config(RetryConfig::standard().with_max_attempts(1))
            .load()
            .await;

        tracing::info!(
            region = %config.region,
            user_pool_id = %config.user_pool_id,
            has_client_secret = config.client_secret.is_some(),
            "Cognito client initialized"
        );

        Self::with_client(Client::new(&sdk_config), config)
    }

    /// Create a gateway with a custom SDK client.
    #[must_use]
    pub fn with_client(client: Client, config: CognitoConfig) -> Self {
        Self { client, config }
    }

    /// The gateway configuration.
    #[must_use]
    pub const fn config(&self) -> &CognitoConfig {
        &self.config
    }

    fn secret_hash(&self, username: &str) -> Option<String> {
        self.config
            .client_secret
            .as_deref()
            .map(|secret| secret_hash(username, &self.config.app_client_id, secret))
    }
}

fn sdk_attribute(attribute: &UserAttribute) -> Result<AttributeType> {
    AttributeType::builder()
        .name(&attribute.name)
        .value(&attribute.value)
        .build()
        .map_err(|e| IdpError::InvalidRequest(e.to_string()))
}

#[async_trait]
impl IdentityGateway for CognitoGateway {
    async fn sign_up(&self, account: &NewAccount) -> Result<()> {
        let mut request = self
            .client
            .sign_up()
            .client_id(&self.config.app_client_id)
            .username(&account.username)
            .password(&account.password);

        for attribute in &account.attributes {
            request = request.user_attributes(sdk_attribute(attribute)?);
        }
        if let Some(hash) = self.secret_hash(&account.username) {
            request = request.secret_hash(hash);
        }

        request.send().await.map_err(|e| {
            let message = DisplayErrorContext(&e).to_string();
            tracing::warn!(username = %account.username, error = %message, "Cognito sign up failed");
            IdpError::SignUp(message)
        })?;

        tracing::debug!(username = %account.username, "Cognito account created");
        Ok(())
    }

    async fn confirm_sign_up(&self, username: &str) -> Result<()> {
        self.client
            .admin_confirm_sign_up()
            .user_pool_id(&self.config.user_pool_id)
            .username(username)
            .send()
            .await
            .map_err(|e| IdpError::ConfirmSignUp(DisplayErrorContext(&e).to_string()))?;

        tracing::debug!(username = %username, "Cognito account confirmed");
        Ok(())
    }

    async fn initiate_auth(&self, username: &str, password: &str) -> Result<AuthTokens> {
        let mut request = self
            .client
            .initiate_auth()
            .auth_flow(AuthFlowType::UserPasswordAuth)
            .client_id(&self.config.app_client_id)
            .auth_parameters("USERNAME", username)
            .auth_parameters("PASSWORD", password);

        if let Some(hash) = self.secret_hash(username) {
            request = request.auth_parameters("SECRET_HASH", hash);
        }

        let output = request
            .send()
            .await
            .map_err(|e| IdpError::Authentication(DisplayErrorContext(&e).to_string()))?;

        let Some(result) = output.authentication_result() else {
            let challenge = output
                .challenge_name()
                .map_or("unknown", |c| c.as_str())
                .to_string();
            tracing::info!(username = %username, challenge = %challenge, "Cognito returned a challenge");
            return Err(IdpError::ChallengeRequired(challenge));
        };

        Ok(AuthTokens {
            access_token: result.access_token().map(str::to_string),
            expires_in: Some(i64::from(result.expires_in())),
            id_token: result.id_token().map(str::to_string),
            refresh_token: result.refresh_token().map(str::to_string),
            token_type: result.token_type().map(str::to_string),
        })
    }

    async fn update_attributes(&self, username: &str, attributes: &[UserAttribute]) -> Result<()> {
        let mut request = self
            .client
            .admin_update_user_attributes()
            .user_pool_id(&self.config.user_pool_id)
            .username(username);

        for attribute in attributes {
            request = request.user_attributes(sdk_attribute(attribute)?);
        }

        request
            .send()
            .await
            .map_err(|e| IdpError::UpdateAttributes(DisplayErrorContext(&e).to_string()))?;

        tracing::debug!(username = %username, count = attributes.len(), "Cognito attributes updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(client_secret: Option<&str>) -> CognitoGateway {
        let sdk_config = aws_sdk_cognitoidentityprovider::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        CognitoGateway::with_client(
            Client::from_conf(sdk_config),
            CognitoConfig {
                app_client_id: "app-client-id".to_string(),
                client_secret: client_secret.map(str::to_string),
                ..CognitoConfig::default()
            },
        )
    }

    #[test]
    fn secret_hash_only_with_client_secret() {
        assert_eq!(gateway(None).secret_hash("alice"), None);
        assert_eq!(
            gateway(Some("client-secret")).secret_hash("alice").as_deref(),
            Some("FSRcrqFYcL5Xx+rbTeRYxPDJfEN5zSYRdnDx+lZKN14=")
        );
    }

    #[test]
    fn attributes_convert() {
        let attribute = sdk_attribute(&UserAttribute::new("custom:role", "owner")).unwrap();
        assert_eq!(attribute.name(), "custom:role");
        assert_eq!(attribute.value(), Some("owner"));
    }
}
