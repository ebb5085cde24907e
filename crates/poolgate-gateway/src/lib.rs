//! HTTP front door for a Cognito user pool.
//!
//! This crate exposes the public API:
//!
//! - `POST /signup` creates an account and confirms it immediately
//! - `POST /signin` exchanges a username and password for tokens
//! - `POST /verify` lets an `owner` token rewrite another account's role
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Clients (HTTP)                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     poolgate-gateway                         │
//! │  ┌──────────────────────┐  ┌───────────────────────────┐    │
//! │  │  Router + Handlers   │  │  ApiError → JSON envelope │    │
//! │  └──────────────────────┘  └───────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                │                              │
//!                ▼                              ▼
//!        ┌───────────────┐              ┌───────────────┐
//!        │ poolgate-idp  │              │ poolgate-auth │
//!        │ (Cognito API) │              │ (JWKS + JWT)  │
//!        └───────────────┘              └───────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use poolgate_auth::{AuthConfig, JwksValidator};
//! use poolgate_gateway::{create_router, GatewayConfig, GatewayState};
//! use poolgate_idp::{CognitoConfig, CognitoGateway};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let idp = Arc::new(CognitoGateway::from_env(CognitoConfig::default()).await);
//! let jwt_validator = Arc::new(JwksValidator::new(&AuthConfig::default())?);
//!
//! let state = GatewayState::new(idp, jwt_validator, GatewayConfig::default());
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::{GatewayConfig, SignupFailurePolicy};
pub use error::ApiError;
pub use routes::create_router;
pub use state::GatewayState;
