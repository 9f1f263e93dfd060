//! Upstream proxying
//!
//! Two forwarders share one HTTP client:
//! - the gateway proxy relays any method to `<gateway-base>/<stage>/<path>`
//! - the queue proxy relays `GET`/`POST` to `<queue-base>/queue/<path>`

mod error;
mod handlers;
mod target;

pub use error::ProxyError;
pub use handlers::{gateway_proxy, queue_proxy, CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS};
pub use target::{base_with_stage, build_target_url};

use postingexpert_core::branding;
use std::sync::Arc;

/// Where proxied requests go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    /// API Gateway base URL, with or without the stage segment
    pub gateway_base: String,
    /// Deployment stage segment (e.g. `prod`)
    pub stage: String,
    /// Queue service host
    pub queue_base: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            gateway_base: branding::DEFAULT_GATEWAY_BASE_URL.to_string(),
            stage: branding::DEFAULT_API_STAGE.to_string(),
            queue_base: branding::DEFAULT_BACKEND_URL.to_string(),
        }
    }
}

impl UpstreamConfig {
    /// Read from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read from an arbitrary variable source.
    ///
    /// Base URL: `NEXT_PUBLIC_GATEWAY_BASE_URL`, then `NEXT_PUBLIC_LAMBDA_URL`.
    /// Stage: `NEXT_PUBLIC_API_STAGE`. Queue host: `EC2_BASE_URL`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            gateway_base: var("NEXT_PUBLIC_GATEWAY_BASE_URL")
                .or_else(|| var("NEXT_PUBLIC_LAMBDA_URL"))
                .unwrap_or(defaults.gateway_base),
            stage: var("NEXT_PUBLIC_API_STAGE").unwrap_or(defaults.stage),
            queue_base: var("EC2_BASE_URL").unwrap_or(defaults.queue_base),
        }
    }

    pub fn with_gateway_base(mut self, base: impl Into<String>) -> Self {
        self.gateway_base = base.into();
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = stage.into();
        self
    }

    pub fn with_queue_base(mut self, base: impl Into<String>) -> Self {
        self.queue_base = base.into();
        self
    }
}

/// Shared state of the proxy routes
#[derive(Clone)]
pub struct ProxyState {
    pub http: reqwest::Client,
    pub upstream: Arc<UpstreamConfig>,
}

impl ProxyState {
    pub fn new(upstream: UpstreamConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            upstream: Arc::new(upstream),
        }
    }

    /// Use a custom HTTP client (connection pool reuse, tests)
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }
}
