//! Per-request correlation
//!
//! Every request gets a 6-hex-char trace id and a route label so the proxy's
//! entry and exit lines can be matched up in the logs.

use std::fmt;
use std::time::Instant;

use axum::http::{Method, StatusCode};
use tracing::{info, info_span, warn, Span};
use uuid::Uuid;

/// Short random trace id, e.g. `"3fa2c1"`
pub fn generate_trace_id() -> String {
    Uuid::new_v4().simple().to_string()[..6].to_string()
}

/// Which route family served a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// `/api/{*path}` forwarded to the API Gateway
    Gateway,
    /// `/api/queue/{*path}` forwarded to the queue service
    Queue,
    /// Answered by this server (`/health`, unknown paths)
    Local,
}

impl RouteKind {
    pub fn classify(path: &str) -> Self {
        match path.strip_prefix("/api/") {
            Some(rest) if rest.starts_with("queue/") => Self::Queue,
            Some(_) => Self::Gateway,
            None => Self::Local,
        }
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gateway => "gateway",
            Self::Queue => "queue",
            Self::Local => "local",
        })
    }
}

#[derive(Debug, Clone)]
pub struct TraceContext {
    pub trace_id: String,
    pub method: Method,
    pub path: String,
    pub route: RouteKind,
    started_at: Instant,
}

impl TraceContext {
    pub fn new(method: &Method, path: &str) -> Self {
        Self {
            trace_id: generate_trace_id(),
            method: method.clone(),
            path: path.to_string(),
            route: RouteKind::classify(path),
            started_at: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }

    /// Span that tags child log lines with the trace id
    pub fn span(&self) -> Span {
        info_span!(
            "proxy_request",
            trace_id = %self.trace_id,
            route = %self.route,
        )
    }

    pub fn log_entry(&self) {
        info!(
            trace_id = %self.trace_id,
            "→ {} {} [{}]",
            self.method,
            self.path,
            self.route
        );
    }

    /// Exit line; failures are logged at WARN with the status reason
    pub fn log_exit(&self, status: StatusCode) {
        let elapsed = self.elapsed_ms();
        if status.is_client_error() || status.is_server_error() {
            warn!(
                trace_id = %self.trace_id,
                "← {} {} ({}ms)",
                status.as_u16(),
                status.canonical_reason().unwrap_or("error"),
                elapsed
            );
        } else {
            info!(trace_id = %self.trace_id, "← {} ({}ms)", status.as_u16(), elapsed);
        }
    }
}
