//! Routes answered by this server instead of being proxied

use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::proxy::ProxyState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// API Gateway stage requests are forwarded to
    pub stage: String,
}

/// `GET /health`
pub async fn health(State(state): State<ProxyState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        stage: state.upstream.stage.clone(),
    })
}
