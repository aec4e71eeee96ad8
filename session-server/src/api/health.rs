//! Health check
//!
//! ```json
//! {
//!   "status": "ok",
//!   "version": "0.1.0",
//!   "revocationStore": "postgres",
//!   "identityStrategy": "local-verify"
//! }
//! ```
//!
//! `status` is `degraded` when the revocation store does not answer, since
//! every authenticated request would then be rejected.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

/// Public route, no identity required
pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    revocation_store: &'static str,
    identity_strategy: &'static str,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let status = match state.revocations.is_revoked("health-probe").await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Revocation store probe failed");
            "degraded"
        }
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        revocation_store: state.revocations.backend(),
        identity_strategy: state.config.identity_strategy.as_str(),
    })
}
