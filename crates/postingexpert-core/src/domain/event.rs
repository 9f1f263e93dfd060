//! Domain Events
//!
//! Every observable change of the session or of a social connection is an
//! event. The connect screen re-renders from them; the server binary only logs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ConnectionState, ConnectionStatus, Platform};

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEndReason {
    Logout,
    Expired,
    /// The backend rejected the token (401/403 or an auth-related message)
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    SessionStarted {
        username: Option<String>,
    },
    SessionEnded {
        reason: SessionEndReason,
    },
    ConnectStarted {
        platform: Platform,
        attempt_id: Uuid,
    },
    ConnectionStateChanged {
        platform: Platform,
        state: ConnectionState,
    },
    /// Cached status changed (flag or detail)
    ConnectionStatusChanged {
        platform: Platform,
        status: ConnectionStatus,
    },
    /// Fires once per false → true transition
    PlatformConnected {
        platform: Platform,
    },
    PlatformDisconnected {
        platform: Platform,
    },
}

impl DomainEvent {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::SessionEnded { .. } => "session_ended",
            Self::ConnectStarted { .. } => "connect_started",
            Self::ConnectionStateChanged { .. } => "connection_state_changed",
            Self::ConnectionStatusChanged { .. } => "connection_status_changed",
            Self::PlatformConnected { .. } => "platform_connected",
            Self::PlatformDisconnected { .. } => "platform_disconnected",
        }
    }

    /// Platform this event concerns, if any
    pub fn platform(&self) -> Option<Platform> {
        match self {
            Self::ConnectStarted { platform, .. }
            | Self::ConnectionStateChanged { platform, .. }
            | Self::ConnectionStatusChanged { platform, .. }
            | Self::PlatformConnected { platform }
            | Self::PlatformDisconnected { platform } => Some(*platform),
            Self::SessionStarted { .. } | Self::SessionEnded { .. } => None,
        }
    }
}
