//! Session context
//!
//! One explicit owner for the signed-in session. Login calls [`SessionContext::sign_in`],
//! logout and expiry go through [`SessionContext::sign_out`]; everything else
//! reads the token from here instead of poking at storage keys.

mod storage;

pub use storage::{keys, FileSessionStorage, MemorySessionStorage, SessionStorage, StorageResult};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::event_bus::EventSender;
use crate::{DomainEvent, Session, SessionEndReason};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage document is invalid: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Owner of the current session and its persisted copy
pub struct SessionContext {
    current: RwLock<Option<Session>>,
    storage: Arc<dyn SessionStorage>,
    events: Option<EventSender>,
}

impl SessionContext {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            current: RwLock::new(None),
            storage,
            events: None,
        }
    }

    /// In-memory context with nothing persisted
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStorage::new()))
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Load a previously persisted session.
    ///
    /// An expired session is cleared and not restored.
    pub async fn restore(&self) -> Result<Option<Session>, SessionError> {
        let Some(token) = self.storage.get(keys::TOKEN).await? else {
            debug!("[Session] Nothing to restore");
            return Ok(None);
        };

        let expires_at = self
            .storage
            .get(keys::TOKEN_EXPIRY)
            .await?
            .and_then(|raw| raw.parse::<i64>().ok())
            .and_then(DateTime::<Utc>::from_timestamp_millis);

        let session = Session {
            token,
            expires_at,
            username: self.storage.get(keys::USERNAME).await?,
            user_id: self.storage.get(keys::USER_ID).await?,
        };

        if session.is_expired() {
            info!("[Session] Persisted session expired, clearing");
            self.clear_storage().await?;
            return Ok(None);
        }

        *self.current.write() = Some(session.clone());
        info!(username = ?session.username, "[Session] Restored session");
        Ok(Some(session))
    }

    /// Start a session and persist it
    pub async fn sign_in(&self, session: Session) -> Result<(), SessionError> {
        self.storage.set(keys::TOKEN, &session.token).await?;
        match session.expires_at {
            Some(at) => {
                self.storage
                    .set(keys::TOKEN_EXPIRY, &at.timestamp_millis().to_string())
                    .await?
            }
            None => self.storage.remove(keys::TOKEN_EXPIRY).await?,
        }
        if let Some(username) = &session.username {
            self.storage.set(keys::USERNAME, username).await?;
        }
        if let Some(user_id) = &session.user_id {
            self.storage.set(keys::USER_ID, user_id).await?;
        }

        info!(username = ?session.username, "[Session] Signed in");
        let username = session.username.clone();
        *self.current.write() = Some(session);
        self.emit(DomainEvent::SessionStarted { username });
        Ok(())
    }

    /// End the session and clear its persisted keys
    pub async fn sign_out(&self, reason: SessionEndReason) -> Result<(), SessionError> {
        let had_session = self.current.write().take().is_some();
        self.clear_storage().await?;
        if had_session {
            info!(?reason, "[Session] Signed out");
            self.emit(DomainEvent::SessionEnded { reason });
        }
        Ok(())
    }

    /// Snapshot of the current session, if any
    pub fn current(&self) -> Option<Session> {
        self.current.read().clone()
    }

    /// Bearer token for authenticated calls.
    ///
    /// Returns `None` when signed out. An expired session is signed out here.
    pub async fn token(&self) -> Option<String> {
        let session = self.current()?;
        if session.is_expired() {
            if let Err(e) = self.sign_out(SessionEndReason::Expired).await {
                warn!("[Session] Failed to clear expired session: {}", e);
            }
            return None;
        }
        Some(session.token)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().map(|s| !s.is_expired()).unwrap_or(false)
    }

    /// Identifier sent as OAuth `state`.
    ///
    /// `None` when signed out or expired; an expired session is signed out here.
    pub async fn app_user(&self) -> Option<String> {
        self.token().await?;
        self.current()
            .and_then(|s| s.app_user().map(str::to_string))
    }

    pub async fn brand_name(&self) -> Result<Option<String>, SessionError> {
        self.storage.get(keys::BRAND_NAME).await
    }

    pub async fn set_brand_name(&self, brand: &str) -> Result<(), SessionError> {
        self.storage.set(keys::BRAND_NAME, brand).await
    }

    pub async fn set_business_type(&self, business_type: &str) -> Result<(), SessionError> {
        self.storage.set(keys::BUSINESS_TYPE, business_type).await
    }

    async fn clear_storage(&self) -> Result<(), SessionError> {
        for key in keys::SESSION_KEYS {
            self.storage.remove(key).await?;
        }
        Ok(())
    }

    fn emit(&self, event: DomainEvent) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }
}
