//! Gateway Server
//!
//! Axum service exposing the proxy routes next to the dashboard pages.

mod handlers;
pub mod logging_middleware;

pub use handlers::{health, HealthResponse};

use axum::{
    middleware,
    routing::get,
    Router,
};
use postingexpert_core::branding;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::proxy::{gateway_proxy, queue_proxy, ProxyState, UpstreamConfig};

/// Gateway server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Proxy destinations
    pub upstream: UpstreamConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: branding::DEFAULT_GATEWAY_PORT,
            upstream: UpstreamConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Read from the process environment (`GATEWAY_HOST`, `GATEWAY_PORT`, upstream vars)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let port = match lookup("GATEWAY_PORT").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid GATEWAY_PORT {:?}: {}", raw, e))?,
            None => defaults.port,
        };
        Ok(Self {
            host: lookup("GATEWAY_HOST")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.host),
            port,
            upstream: UpstreamConfig::from_lookup(&lookup),
        })
    }

    /// Socket address to bind
    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid bind address {}:{}: {}", self.host, self.port, e))
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Build the gateway router for a proxy state
pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/queue/{*path}", get(queue_proxy).post(queue_proxy))
        .route(
            "/api/{*path}",
            get(gateway_proxy)
                .post(gateway_proxy)
                .put(gateway_proxy)
                .delete(gateway_proxy)
                .options(gateway_proxy),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(
            logging_middleware::http_logging_middleware,
        ))
}

/// Same-origin proxy server
pub struct GatewayServer {
    config: GatewayConfig,
    state: ProxyState,
    shutdown: CancellationToken,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig) -> Self {
        info!("[Gateway] Initializing...");
        let state = ProxyState::new(config.upstream.clone());
        Self {
            config,
            state,
            shutdown: CancellationToken::new(),
        }
    }

    /// Use a custom HTTP client for upstream calls
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.state = self.state.with_http_client(http);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Token that stops [`GatewayServer::run`] gracefully when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn build_router(&self) -> Router {
        router(self.state.clone())
    }

    /// Bind and serve until the shutdown token is cancelled
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.addr()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener (ephemeral ports in tests)
    pub async fn serve(self, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
        let upstream = &self.config.upstream;
        info!("[Gateway] Listening on {}", listener.local_addr()?);
        info!(
            "[Gateway] Upstream: {} (stage {}), queue: {}",
            upstream.gateway_base, upstream.stage, upstream.queue_base
        );

        let router = self.build_router();
        let shutdown = self.shutdown.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("[Gateway] Stopped");
        Ok(())
    }

    /// Start the server in the background
    pub fn spawn(self) -> tokio::task::JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
