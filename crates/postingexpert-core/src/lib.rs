//! # PostingExpert Core Library
//!
//! Domain types shared by the gateway and the connect bridge.
//!
//! ## Modules
//!
//! - `branding` - Product naming, well-known paths and defaults
//! - `domain` - Platforms, sessions, connection status, OAuth callback messages
//! - `session` - Explicit session context and its storage backends
//! - `event_bus` - Broadcast distribution of domain events

pub mod branding;
pub mod domain;
pub mod event_bus;
pub mod session;

// Re-export commonly used types
pub use domain::*;
pub use event_bus::{EventBus, EventReceiver, EventSender};
pub use session::{
    FileSessionStorage, MemorySessionStorage, SessionContext, SessionError, SessionStorage,
};
