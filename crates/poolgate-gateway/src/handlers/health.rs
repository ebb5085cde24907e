//! Liveness endpoints.

use axum::Json;
use serde::Serialize;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `healthy` while the process serves requests.
    pub status: &'static str,
    /// Crate version of the running binary.
    pub version: &'static str,
}

/// `GET /`: plain-text greeting for liveness checks.
pub async fn welcome() -> &'static str {
    "welcome"
}

/// `GET /health`: JSON status for load balancers.
///
/// Does not call the identity provider or the key endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}
