//! Centralized branding constants
//!
//! Product naming, well-known front-end paths and default endpoints live here
//! so the gateway, the connect bridge and the server binary agree on them.

use std::path::PathBuf;

/// Human-readable product name
pub const DISPLAY_NAME: &str = "PostingExpert";

/// Lowercase identifier used for directories and log files
pub const APP_ID: &str = "postingexpert";

/// Log file prefix (e.g. `postingexpert.2026-10-18.log`)
pub const LOG_PREFIX: &str = "postingexpert";

/// Default port for the gateway HTTP service
pub const DEFAULT_GATEWAY_PORT: u16 = 3000;

/// Login page path; every authentication failure ends here
pub const LOGIN_PATH: &str = "/login";

/// Connect page path, the landing page after a successful registration
pub const CONNECT_PATH: &str = "/connect";

/// Default API Gateway base URL (already includes the `prod` stage)
pub const DEFAULT_GATEWAY_BASE_URL: &str =
    "https://4fqbpp1yya.execute-api.ap-south-1.amazonaws.com/prod";

/// Default API Gateway deployment stage
pub const DEFAULT_API_STAGE: &str = "prod";

/// Default host for the queue service and the REST API
pub const DEFAULT_BACKEND_URL: &str = "http://13.233.45.167:5000";

/// Number of platforms shown on the connect screen
pub const CONNECTABLE_PLATFORM_COUNT: usize = 3;

/// Default directory for persisted client-side state
///
/// Linux: `~/.local/share/postingexpert`, Windows: `%LOCALAPPDATA%\postingexpert`
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_ID)
}

/// Default location of the persisted session document
pub fn session_file() -> PathBuf {
    data_dir().join("session.json")
}

/// Default location of rolling log files
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Fallback brand label when nothing better is known
pub fn default_brand_name(username: &str) -> String {
    format!("{} Brand", username)
}
