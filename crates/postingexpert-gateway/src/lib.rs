//! PostingExpert Gateway
//!
//! Same-origin HTTP service for the dashboard:
//! - `/api/{*path}` forwarded to the API Gateway with its deployment stage
//! - `/api/queue/{*path}` forwarded to the queue service
//! - CORS preflight answered locally
//! - Request logging with trace ids

pub mod logging;
pub mod proxy;
pub mod server;

pub use proxy::{build_target_url, ProxyError, ProxyState, UpstreamConfig};
pub use server::{GatewayConfig, GatewayServer};
