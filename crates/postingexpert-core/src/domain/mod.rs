//! Domain entities

mod callback;
mod connection;
mod event;
mod platform;
mod profile;
mod session;

pub use callback::CallbackMessage;
pub use connection::{
    coerce_connected, normalize_status, ConnectionSnapshot, ConnectionState, ConnectionStatus,
    MergeOutcome,
};
pub use event::{DomainEvent, SessionEndReason};
pub use platform::{ParsePlatformError, Platform};
pub use profile::UserProfile;
pub use session::Session;
