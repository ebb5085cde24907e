//! Role-gated attribute update: `/verify`.
//!
//! The caller presents a bearer token. Only a verified token whose role
//! satisfies the `update_role` rule may rewrite another account's role.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;

use poolgate_auth::{bearer_token, AuthError, JwtValidator, ROLE_CLAIM, UPDATE_ROLE};
use poolgate_idp::{IdentityGateway, UserAttribute};

use crate::error::ApiError;
use crate::handlers::accounts::{require_fields, SignUpRequest};
use crate::state::GatewayState;

/// Set the target account's `custom:role` on behalf of an owner.
///
/// Checks run in order, and nothing is mutated unless all of them pass:
/// request body, `Authorization` shape, target fields, token, role.
///
/// # Errors
///
/// Returns 400 for input and token problems, 403 when the caller's role is
/// not allowed, and 500 when keys cannot be fetched or the update fails.
pub async fn verify<G, V>(
    State(state): State<Arc<GatewayState<G, V>>>,
    headers: HeaderMap,
    body: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    G: IdentityGateway + 'static,
    V: JwtValidator + 'static,
{
    let Json(body) = body?;

    let header = headers
        .get(AUTHORIZATION)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| ApiError::BadRequest("authorization header is not valid text".into()))
        })
        .transpose()?;
    let token = bearer_token(header).map_err(AuthError::from)?;

    require_fields(&[
        ("username", body.username.as_str()),
        ("role", body.role.as_str()),
    ])?;

    let claims = state.jwt_validator.validate(token).await?;

    let decision = state.policy.authorize(&claims, UPDATE_ROLE);
    if !decision.is_allowed() {
        tracing::warn!(
            caller = claims.username().unwrap_or("<unknown>"),
            role = decision.role().unwrap_or("<none>"),
            target = %body.username,
            "Role update denied"
        );
    }
    decision.ensure_allowed()?;

    state
        .idp
        .update_attributes(
            &body.username,
            &[UserAttribute::new(ROLE_CLAIM, body.role.as_str())],
        )
        .await?;

    tracing::info!(
        caller = claims.username().unwrap_or("<unknown>"),
        target = %body.username,
        role = %body.role,
        "Role updated"
    );
    Ok("verified!")
}
