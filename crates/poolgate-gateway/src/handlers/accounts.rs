//! Account endpoints: `/signup` and `/signin`.
//!
//! Both delegate to the identity provider; nothing about the account is
//! kept locally.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use poolgate_auth::{JwtValidator, ROLE_CLAIM};
use poolgate_idp::{AuthTokens, IdentityGateway, NewAccount, UserAttribute};

use crate::config::SignupFailurePolicy;
use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Body of `/signup` and `/verify`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignUpRequest {
    /// Login name.
    pub username: String,
    /// Password.
    pub password: String,
    /// Email address, stored when non-empty.
    pub email: String,
    /// Role stored in `custom:role`.
    pub role: String,
}

/// Body of `/signin`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignInRequest {
    /// Login name.
    pub username: String,
    /// Password.
    pub password: String,
}

/// Tokens returned by `/signin`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignInResponse {
    /// Access token.
    pub access_token: Option<String>,
    /// Token lifetime in seconds.
    pub expires_in: Option<i64>,
    /// ID token.
    pub id_token: Option<String>,
    /// Refresh token.
    pub refresh_token: Option<String>,
    /// Token type.
    pub token_type: Option<String>,
}

impl From<AuthTokens> for SignInResponse {
    fn from(tokens: AuthTokens) -> Self {
        Self {
            access_token: tokens.access_token,
            expires_in: tokens.expires_in,
            id_token: tokens.id_token,
            refresh_token: tokens.refresh_token,
            token_type: tokens.token_type,
        }
    }
}

/// Reject the first empty field by name.
pub(crate) fn require_fields(fields: &[(&str, &str)]) -> Result<(), ApiError> {
    match fields.iter().find(|(_, value)| value.is_empty()) {
        Some((name, _)) => Err(ApiError::BadRequest(format!("{name} is required"))),
        None => Ok(()),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Create and immediately confirm an account.
///
/// # Errors
///
/// Returns 400 for a bad body and 500 when the provider fails. A failed
/// sign-up only reaches confirmation under `SignupFailurePolicy::ConfirmAnyway`.
pub async fn signup<G, V>(
    State(state): State<Arc<GatewayState<G, V>>>,
    body: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    G: IdentityGateway + 'static,
    V: JwtValidator + 'static,
{
    let Json(body) = body?;
    require_fields(&[
        ("username", body.username.as_str()),
        ("password", body.password.as_str()),
    ])?;

    let mut attributes = vec![UserAttribute::new(ROLE_CLAIM, body.role.as_str())];
    if !body.email.is_empty() {
        attributes.push(UserAttribute::new("email", body.email.as_str()));
    }

    let account = NewAccount {
        username: body.username,
        password: body.password,
        attributes,
    };

    if let Err(err) = state.idp.sign_up(&account).await {
        match state.config.signup_failure_policy {
            SignupFailurePolicy::Abort => return Err(err.into()),
            SignupFailurePolicy::ConfirmAnyway => {
                tracing::warn!(
                    username = %account.username,
                    error = %err,
                    "Sign up failed, confirming anyway"
                );
            }
        }
    }

    state.idp.confirm_sign_up(&account.username).await?;

    tracing::info!(username = %account.username, "Account signed up");
    Ok("signup!")
}

/// Exchange a username and password for tokens.
///
/// # Errors
///
/// Returns 400 for a bad body and 500 when the provider rejects the
/// credentials or asks for a challenge.
pub async fn signin<G, V>(
    State(state): State<Arc<GatewayState<G, V>>>,
    body: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    G: IdentityGateway + 'static,
    V: JwtValidator + 'static,
{
    let Json(body) = body?;
    require_fields(&[
        ("username", body.username.as_str()),
        ("password", body.password.as_str()),
    ])?;

    let tokens = state
        .idp
        .initiate_auth(&body.username, &body.password)
        .await?;

    tracing::info!(username = %body.username, "Account signed in");
    Ok(Json(SignInResponse::from(tokens)))
}
