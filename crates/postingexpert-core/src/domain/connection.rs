//! Social connection status
//!
//! The backend owns the truth about which accounts are connected. This module
//! holds the cached snapshot used for rendering, the per-platform connect state
//! machine, and the defensive normalization of the backend's status envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::Platform;

/// Connection status of one platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    /// Opaque backend detail (posting mode, organization URNs, username, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl ConnectionStatus {
    pub fn connected(detail: Option<Value>) -> Self {
        Self {
            connected: true,
            detail,
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Short line shown under the platform name on the connect card
    pub fn summary(&self, platform: Platform) -> String {
        if !self.connected {
            return "Not connected".to_string();
        }
        let field = |name: &str| {
            self.detail
                .as_ref()
                .and_then(|d| d.get(name))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        match platform {
            Platform::Facebook => field("page_name").map(|p| format!("Page: {}", p)),
            Platform::Instagram => field("username")
                .or_else(|| field("instagram_username"))
                .map(|u| format!("@{}", u)),
            Platform::LinkedIn => field("posting_method").map(|m| format!("Mode: {}", m)),
        }
        .unwrap_or_else(|| "Connected".to_string())
    }
}

/// Per-platform connect lifecycle.
///
/// `Disconnected → Connecting → Connected | Failed → Disconnecting → Disconnected`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed {
        error: String,
    },
    Disconnecting,
}

impl ConnectionState {
    /// A request or popup is in flight for this platform
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Connecting | Self::Disconnecting)
    }

    /// State implied by an authoritative status
    pub fn from_status(status: &ConnectionStatus) -> Self {
        if status.connected {
            Self::Connected
        } else {
            Self::Disconnected
        }
    }
}

/// Result of merging a status into the snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Anything (flag or detail) changed
    pub changed: bool,
    /// `connected` flipped from false to true
    pub became_connected: bool,
    /// `connected` flipped from true to false
    pub became_disconnected: bool,
}

/// Latest known connection status of every platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    platforms: BTreeMap<Platform, ConnectionStatus>,
}

impl ConnectionSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status of a platform; unknown platforms are disconnected
    pub fn get(&self, platform: Platform) -> ConnectionStatus {
        self.platforms.get(&platform).cloned().unwrap_or_default()
    }

    pub fn is_connected(&self, platform: Platform) -> bool {
        self.platforms
            .get(&platform)
            .map(|s| s.connected)
            .unwrap_or(false)
    }

    /// Number of connected platforms
    pub fn connected_count(&self) -> usize {
        self.platforms.values().filter(|s| s.connected).count()
    }

    /// Merge one platform's status.
    ///
    /// Merging a status equal to the cached one is a no-op, so the same update
    /// may arrive from both the callback message and the fallback refresh.
    pub fn merge(&mut self, platform: Platform, status: ConnectionStatus) -> MergeOutcome {
        let previous = self.get(platform);
        if previous == status {
            return MergeOutcome::default();
        }
        let outcome = MergeOutcome {
            changed: true,
            became_connected: !previous.connected && status.connected,
            became_disconnected: previous.connected && !status.connected,
        };
        self.platforms.insert(platform, status);
        outcome
    }

    /// Merge every platform of another snapshot, returning what changed
    pub fn merge_snapshot(&mut self, other: &ConnectionSnapshot) -> Vec<(Platform, MergeOutcome)> {
        Platform::ALL
            .iter()
            .map(|&platform| (platform, self.merge(platform, other.get(platform))))
            .filter(|(_, outcome)| outcome.changed)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Platform, ConnectionStatus)> + '_ {
        Platform::ALL.iter().map(move |&p| (p, self.get(p)))
    }
}

/// Coerce one platform value of the status envelope to a boolean.
///
/// `true`, `{ "connected": true }` and `{ "is_connected": true }` are connected;
/// every other shape is not.
pub fn coerce_connected(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Object(map) => {
            map.get("connected").and_then(Value::as_bool) == Some(true)
                || map.get("is_connected").and_then(Value::as_bool) == Some(true)
        }
        _ => false,
    }
}

/// Normalize a `/social/status` response body into a snapshot.
///
/// Tolerated envelopes: flat (`{ "linkedin": ... }`), nested under `status`,
/// and nested under `connected`.
pub fn normalize_status(body: &Value) -> ConnectionSnapshot {
    let envelope = ["status", "connected"]
        .iter()
        .find_map(|key| body.get(key).filter(|v| v.is_object()))
        .unwrap_or(body);

    let mut snapshot = ConnectionSnapshot::new();
    for platform in Platform::ALL {
        let Some(value) = envelope.get(platform.as_str()) else {
            continue;
        };
        let detail = value
            .get("detail")
            .filter(|d| d.is_object())
            .cloned();
        let status = ConnectionStatus {
            connected: coerce_connected(value),
            detail,
        };
        snapshot.merge(platform, status);
    }
    snapshot
}
