//! PostingExpert Connect
//!
//! Client-side logic behind the "connect social accounts" screen:
//! - `api` - backend REST client (register, login, profile, social status, disconnect)
//! - `account` - register/login/logout flows on top of the session context
//! - `provider` - per-platform OAuth authorization profiles
//! - `host` - the window abstraction (popups, confirmations, notices, navigation)
//! - `bridge` - connect/disconnect state machine and completion race

pub mod account;
pub mod api;
pub mod bridge;
pub mod config;
pub mod error;
pub mod host;
pub mod provider;

pub use account::{AccountService, AuthOutcome};
pub use api::{ApiClient, ApiError, AuthResponse, LoginRequest, RegisterRequest};
pub use bridge::{Completion, ConnectBridge, ConnectOutcome, DisconnectOutcome, MessageChannel};
pub use config::{ConnectConfig, OAuthClientCredentials};
pub use error::ConnectError;
pub use host::{ConnectHost, Notice, NoticeLevel, PopupGeometry, PopupWindow, ScreenMetrics};
pub use provider::ProviderProfile;
