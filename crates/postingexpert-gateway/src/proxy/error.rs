use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::error;

/// Failure to reach or read an upstream.
///
/// Upstream non-2xx responses are not errors; they are relayed as-is.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("invalid upstream URL: {0}")]
    InvalidTarget(#[from] url::ParseError),

    #[error("{0}")]
    Upstream(#[from] reqwest::Error),

    #[error("failed to read request body: {0}")]
    Body(#[from] axum::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        error!("[Proxy] Request failed: {}", self);
        let message = match self.to_string() {
            m if m.is_empty() => "Proxy request failed".to_string(),
            m => m,
        };
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": message })),
        )
            .into_response()
    }
}
