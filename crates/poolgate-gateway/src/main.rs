//! Poolgate Gateway - HTTP front door for a Cognito user pool
//!
//! Configuration comes from the environment:
//!
//! - `LISTEN_ADDR` (or `PORT`, bound on all interfaces)
//! - `AWS_DEFAULT_REGION`
//! - `COGNITO_USER_POOL_ID`, `COGNITO_APP_CLIENT_ID`, `CLIENT_SECRET`
//! - `POOLGATE_ISSUER` to verify tokens from a non-Cognito issuer
//! - `SIGNUP_FAILURE_POLICY` (`abort` or `confirm_anyway`)

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use poolgate_auth::{AuthConfig, JwksValidator};
use poolgate_gateway::{create_router, GatewayConfig, GatewayState, SignupFailurePolicy};
use poolgate_idp::{CognitoConfig, CognitoGateway};

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,poolgate=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Poolgate Gateway");

    // Load configuration from environment
    let listen_addr = env_opt("LISTEN_ADDR").unwrap_or_else(|| {
        let port = env_opt("PORT").unwrap_or_else(|| "8080".into());
        format!("0.0.0.0:{port}")
    });
    let region = env_opt("AWS_DEFAULT_REGION").unwrap_or_else(|| "us-east-1".into());
    let user_pool_id = env_opt("COGNITO_USER_POOL_ID").unwrap_or_default();
    let app_client_id = env_opt("COGNITO_APP_CLIENT_ID").unwrap_or_default();
    let client_secret = env_opt("CLIENT_SECRET");
    let issuer_override = env_opt("POOLGATE_ISSUER");
    let signup_failure_policy = match env_opt("SIGNUP_FAILURE_POLICY") {
        Some(value) => value.parse::<SignupFailurePolicy>()?,
        None => SignupFailurePolicy::default(),
    };

    if user_pool_id.is_empty() || app_client_id.is_empty() {
        tracing::warn!("COGNITO_USER_POOL_ID or COGNITO_APP_CLIENT_ID is not set");
    }

    tracing::info!(
        listen_addr = %listen_addr,
        region = %region,
        user_pool_id = %user_pool_id,
        app_client_id = %app_client_id,
        has_client_secret = client_secret.is_some(),
        issuer_override = ?issuer_override,
        signup_failure_policy = %signup_failure_policy,
        "Gateway configuration loaded"
    );

    // Identity provider
    let idp = Arc::new(
        CognitoGateway::from_env(CognitoConfig {
            region: region.clone(),
            user_pool_id: user_pool_id.clone(),
            app_client_id,
            client_secret,
            ..CognitoConfig::default()
        })
        .await,
    );

    // JWT validator
    let auth_config = AuthConfig {
        region,
        user_pool_id,
        issuer_override,
        ..AuthConfig::default()
    };
    let jwt_validator = Arc::new(JwksValidator::new(&auth_config)?);
    tracing::info!(jwks_url = %jwt_validator.jwks_url(), "JWT validator initialized");

    // Build gateway state and configuration
    let gateway_config = GatewayConfig {
        listen_addr: listen_addr.clone(),
        signup_failure_policy,
        ..GatewayConfig::default()
    };
    let state = GatewayState::new(idp, jwt_validator, gateway_config);

    let app = create_router(state);

    // Start HTTP server
    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
