//! API error types and responses.
//!
//! This module defines the standard error format for all API responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use poolgate_auth::AuthError;
use poolgate_idp::IdpError;

/// API error type that implements `IntoResponse`.
///
/// The message of each variant is the raw text of the underlying failure.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request body, header or token.
    #[error("{0}")]
    BadRequest(String),

    /// The caller's role does not permit the operation.
    #[error("{0}")]
    Forbidden(String),

    /// Key retrieval or identity provider failure.
    #[error("{0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Error details.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Forbidden(_) => "forbidden",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Token(_) => Self::BadRequest(err.to_string()),
            AuthError::AccessDenied { .. } => Self::Forbidden(err.to_string()),
            AuthError::KeyFetch(_) => {
                tracing::error!(error = %err, "Signing key retrieval failed");
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<IdpError> for ApiError {
    fn from(err: IdpError) -> Self {
        tracing::error!(error = %err, "Identity provider error");
        Self::Internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}
