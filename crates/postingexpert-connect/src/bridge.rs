//! OAuth Connect Bridge
//!
//! Drives one connect or disconnect per platform at a time:
//!
//! 1. `connect` checks the session and the OAuth client, opens the provider
//!    popup, then races the popup's callback message against the popup
//!    closing (and an optional cancellation token).
//! 2. A callback merges its status straight into the snapshot. A closed popup
//!    waits the provider's refresh delay and asks the backend.
//! 3. `disconnect` confirms with the user, calls the backend, and merges the
//!    result.
//!
//! The snapshot merge is idempotent, so a status reported by both the callback
//! and a later refresh produces exactly one `PlatformConnected` event.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use postingexpert_core::{
    branding, CallbackMessage, ConnectionSnapshot, ConnectionState, ConnectionStatus, DomainEvent,
    EventSender, MergeOutcome, Platform, SessionContext, SessionEndReason,
};

use crate::api::ApiClient;
use crate::config::ConnectConfig;
use crate::error::{ConnectError, Result};
use crate::host::{ConnectHost, Notice, PopupGeometry, PopupWindow};
use crate::provider::ProviderProfile;

const MESSAGE_CHANNEL_CAPACITY: usize = 64;

/// Window `postMessage` traffic delivered to the bridge.
///
/// Carries every posted payload; the bridge filters for callback messages.
#[derive(Clone)]
pub struct MessageChannel {
    sender: broadcast::Sender<Value>,
}

impl MessageChannel {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(MESSAGE_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Post a payload; returns the number of listeners
    pub fn post(&self, payload: Value) -> usize {
        self.sender.send(payload).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.sender.subscribe()
    }
}

impl Default for MessageChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// What ended a connect attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Callback(CallbackMessage),
    PopupClosed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectOutcome {
    /// The callback reported success
    Connected(ConnectionStatus),
    /// The callback reported failure
    Failed { error: String },
    /// The popup closed without a callback; status was refreshed
    Closed { connected: bool },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectOutcome {
    Disconnected,
    /// The user declined the confirmation; nothing was sent
    Declined,
    Failed { error: String },
}

pub struct ConnectBridge {
    config: ConnectConfig,
    api: ApiClient,
    session: Arc<SessionContext>,
    host: Arc<dyn ConnectHost>,
    providers: HashMap<Platform, ProviderProfile>,
    messages: MessageChannel,
    snapshot: RwLock<ConnectionSnapshot>,
    states: RwLock<BTreeMap<Platform, ConnectionState>>,
    attempts: Mutex<HashMap<Platform, CancellationToken>>,
    events: Option<EventSender>,
}

impl ConnectBridge {
    pub fn new(
        config: ConnectConfig,
        session: Arc<SessionContext>,
        host: Arc<dyn ConnectHost>,
    ) -> Self {
        let api = ApiClient::new(config.api_base());
        let providers = Platform::ALL
            .iter()
            .filter_map(|&p| ProviderProfile::for_platform(p).map(|profile| (p, profile)))
            .collect();
        Self {
            config,
            api,
            session,
            host,
            providers,
            messages: MessageChannel::new(),
            snapshot: RwLock::new(ConnectionSnapshot::new()),
            states: RwLock::new(BTreeMap::new()),
            attempts: Mutex::new(HashMap::new()),
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Replace the profile of `profile.platform`
    pub fn with_provider(mut self, profile: ProviderProfile) -> Self {
        self.providers.insert(profile.platform, profile);
        self
    }

    pub fn with_api_client(mut self, api: ApiClient) -> Self {
        self.api = api;
        self
    }

    /// Share a message channel created by the host
    pub fn with_message_channel(mut self, messages: MessageChannel) -> Self {
        self.messages = messages;
        self
    }

    pub fn config(&self) -> &ConnectConfig {
        &self.config
    }

    pub fn messages(&self) -> MessageChannel {
        self.messages.clone()
    }

    /// Deliver a `postMessage` payload
    pub fn post_message(&self, payload: Value) -> usize {
        self.messages.post(payload)
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.snapshot.read().clone()
    }

    pub fn state(&self, platform: Platform) -> ConnectionState {
        self.states.read().get(&platform).cloned().unwrap_or_default()
    }

    /// Connected platforms, out of [`branding::CONNECTABLE_PLATFORM_COUNT`]
    pub fn connected_count(&self) -> usize {
        self.snapshot.read().connected_count()
    }

    pub async fn connect(&self, platform: Platform) -> Result<ConnectOutcome> {
        self.connect_with_cancel(platform, CancellationToken::new())
            .await
    }

    /// Connect, aborting when `cancel` fires
    pub async fn connect_with_cancel(
        &self,
        platform: Platform,
        cancel: CancellationToken,
    ) -> Result<ConnectOutcome> {
        let Some(profile) = self.providers.get(&platform).cloned() else {
            self.host.notify(Notice::error(format!(
                "{} cannot be connected yet.",
                platform.display_name()
            )));
            return Err(ConnectError::Unsupported(platform));
        };

        let Some(app_user) = self.session.app_user().await else {
            warn!("[Connect] No app user, redirecting to login");
            self.host
                .notify(Notice::warning("User not found. Please login again."));
            self.host.redirect(branding::LOGIN_PATH);
            return Err(ConnectError::NotAuthenticated);
        };

        let Some(credentials) = self.config.credentials(platform).cloned() else {
            warn!("[Connect] {} OAuth client is not configured", platform);
            self.host.notify(Notice::error(format!(
                "{} connection is not configured. Please contact support.",
                platform.display_name()
            )));
            return Err(ConnectError::NotConfigured(platform));
        };

        let url = profile.authorization_url(&credentials, &app_user)?;
        let prior = self.begin(platform, ConnectionState::Connecting)?;
        let mut guard = AttemptGuard::new(self, platform, prior);

        let attempt_id = Uuid::new_v4();
        info!(%attempt_id, "[Connect] Starting {} authorization", platform);
        self.emit(DomainEvent::ConnectStarted {
            platform,
            attempt_id,
        });

        // Subscribe before the popup exists so an instant callback is not lost
        let mut messages = self.messages.subscribe();

        let geometry =
            PopupGeometry::centered(profile.popup_width, profile.popup_height, self.host.screen());
        let Some(popup) = self.host.open_popup(&url, profile.window_name, geometry) else {
            warn!("[Connect] {} popup blocked", platform);
            self.host.notify(Notice::warning(
                "Popup blocked. Please allow popups for this site and try again.",
            ));
            return Err(ConnectError::PopupBlocked);
        };

        let token = cancel.child_token();
        self.attempts.lock().insert(platform, token.clone());

        let completion =
            await_completion(platform, &profile, popup.as_ref(), &mut messages, &token).await;
        debug!(%attempt_id, ?completion, "[Connect] {} attempt completed", platform);

        let outcome = match completion {
            Completion::Callback(message) if message.success => {
                let status = message.status();
                self.apply_status(platform, status.clone());
                self.set_state(platform, ConnectionState::Connected);
                self.host.notify(Notice::success(message.message.clone().unwrap_or_else(
                    || format!("{} connected successfully!", platform.display_name()),
                )));
                if !popup.is_closed() {
                    popup.close();
                }
                ConnectOutcome::Connected(status)
            }
            Completion::Callback(message) => {
                let error = message.error_or_default();
                warn!("[Connect] {} connection failed: {}", platform, error);
                self.set_state(
                    platform,
                    ConnectionState::Failed {
                        error: error.clone(),
                    },
                );
                self.host.notify(Notice::error(format!(
                    "{} connection failed: {}",
                    platform.display_name(),
                    error
                )));
                ConnectOutcome::Failed { error }
            }
            Completion::PopupClosed => {
                debug!(
                    "[Connect] {} popup closed, refreshing in {:?}",
                    platform, profile.refresh_delay
                );
                sleep(profile.refresh_delay).await;
                if let Err(e) = self.refresh_status().await {
                    warn!("[Connect] Status refresh after popup close failed: {}", e);
                }
                let status = self.snapshot.read().get(platform);
                self.set_state(platform, ConnectionState::from_status(&status));
                ConnectOutcome::Closed {
                    connected: status.connected,
                }
            }
            Completion::Cancelled => {
                info!("[Connect] {} attempt cancelled", platform);
                if !popup.is_closed() {
                    popup.close();
                }
                let status = self.snapshot.read().get(platform);
                self.set_state(platform, ConnectionState::from_status(&status));
                ConnectOutcome::Cancelled
            }
        };

        guard.disarm();
        Ok(outcome)
    }

    /// Cancel an in-flight connect. Returns whether one was running.
    pub fn cancel(&self, platform: Platform) -> bool {
        match self.attempts.lock().remove(&platform) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn disconnect(&self, platform: Platform) -> Result<DisconnectOutcome> {
        let name = platform.display_name();
        if self.state(platform).is_busy() {
            return Err(ConnectError::AlreadyInProgress(platform));
        }

        let question = format!("Are you sure you want to disconnect {}?", name);
        if !self.host.confirm(&question).await {
            debug!("[Connect] {} disconnect declined", platform);
            return Ok(DisconnectOutcome::Declined);
        }

        let (Some(token), Some(app_user)) =
            (self.session.token().await, self.session.app_user().await)
        else {
            self.host.notify(Notice::warning(format!(
                "Please login again to disconnect {}.",
                name
            )));
            self.host.redirect(branding::LOGIN_PATH);
            return Err(ConnectError::NotAuthenticated);
        };

        let prior = self.begin(platform, ConnectionState::Disconnecting)?;
        info!("[Connect] Disconnecting {}", platform);

        let (status, body) = match self.api.disconnect(&token, platform, &app_user).await {
            Ok(response) => response,
            Err(e) => {
                warn!("[Connect] {} disconnect request failed: {}", platform, e);
                self.host.notify(Notice::error(format!(
                    "Error disconnecting {}: {}",
                    name, e
                )));
                self.set_state(platform, prior);
                return Err(e.into());
            }
        };

        if status.as_u16() == 401 && body.get("token_expired").map(is_truthy) == Some(true) {
            warn!("[Connect] Token expired during {} disconnect", platform);
            self.set_state(platform, prior);
            self.session.sign_out(SessionEndReason::Expired).await?;
            self.host.notify(Notice::warning(
                "Your session has expired. Please login again.",
            ));
            self.host.redirect(branding::LOGIN_PATH);
            return Err(ConnectError::SessionExpired);
        }

        if status.is_success() && body.get("success").and_then(Value::as_bool) == Some(true) {
            self.apply_status(platform, ConnectionStatus::disconnected());
            self.set_state(platform, ConnectionState::Disconnected);
            self.host.notify(Notice::success(format!(
                "{} disconnected successfully!",
                name
            )));
            return Ok(DisconnectOutcome::Disconnected);
        }

        let error = ["error", "message"]
            .iter()
            .find_map(|key| body.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()))
            .unwrap_or("Unknown error occurred")
            .to_string();
        warn!("[Connect] {} disconnect failed: {}", platform, error);
        self.set_state(platform, prior);
        self.host.notify(Notice::error(format!(
            "Failed to disconnect {}: {}",
            name, error
        )));
        Ok(DisconnectOutcome::Failed { error })
    }

    /// Fetch the authoritative status and merge it.
    ///
    /// A rejected token ends the session and sends the host to `/login`.
    pub async fn refresh_status(&self) -> Result<ConnectionSnapshot> {
        let (Some(token), Some(app_user)) =
            (self.session.token().await, self.session.app_user().await)
        else {
            return Err(ConnectError::NotAuthenticated);
        };

        let fresh = match self.api.social_status(&token, &app_user).await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_auth_failure() => {
                warn!("[Connect] Status request rejected: {}", e);
                self.session.sign_out(SessionEndReason::Rejected).await?;
                self.host.redirect(branding::LOGIN_PATH);
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        let changes = self.snapshot.write().merge_snapshot(&fresh);
        for (platform, outcome) in changes {
            let status = fresh.get(platform);
            self.emit_merge(platform, &status, outcome);
            if !self.state(platform).is_busy() {
                self.set_state(platform, ConnectionState::from_status(&status));
            }
        }
        Ok(self.snapshot())
    }

    /// Atomically move an idle platform into a busy state
    fn begin(&self, platform: Platform, next: ConnectionState) -> Result<ConnectionState> {
        let prior = {
            let mut states = self.states.write();
            let current = states.get(&platform).cloned().unwrap_or_default();
            if current.is_busy() {
                return Err(ConnectError::AlreadyInProgress(platform));
            }
            states.insert(platform, next.clone());
            current
        };
        self.emit(DomainEvent::ConnectionStateChanged {
            platform,
            state: next,
        });
        Ok(prior)
    }

    fn set_state(&self, platform: Platform, state: ConnectionState) {
        let previous = self.states.write().insert(platform, state.clone());
        if previous.unwrap_or_default() != state {
            self.emit(DomainEvent::ConnectionStateChanged { platform, state });
        }
    }

    fn apply_status(&self, platform: Platform, status: ConnectionStatus) -> MergeOutcome {
        let outcome = self.snapshot.write().merge(platform, status.clone());
        self.emit_merge(platform, &status, outcome);
        outcome
    }

    fn emit_merge(&self, platform: Platform, status: &ConnectionStatus, outcome: MergeOutcome) {
        if !outcome.changed {
            return;
        }
        self.emit(DomainEvent::ConnectionStatusChanged {
            platform,
            status: status.clone(),
        });
        if outcome.became_connected {
            info!("[Connect] {} connected", platform);
            self.emit(DomainEvent::PlatformConnected { platform });
        }
        if outcome.became_disconnected {
            info!("[Connect] {} disconnected", platform);
            self.emit(DomainEvent::PlatformDisconnected { platform });
        }
    }

    fn emit(&self, event: DomainEvent) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }
}

/// Releases a connect attempt whose future is dropped before it finishes.
///
/// Removes the cancellation entry and puts the platform back in the state it
/// had before `begin`. Disarmed once the attempt has settled its own state.
struct AttemptGuard<'a> {
    bridge: &'a ConnectBridge,
    platform: Platform,
    prior: Option<ConnectionState>,
}

impl<'a> AttemptGuard<'a> {
    fn new(bridge: &'a ConnectBridge, platform: Platform, prior: ConnectionState) -> Self {
        Self {
            bridge,
            platform,
            prior: Some(prior),
        }
    }

    fn disarm(&mut self) {
        self.prior = None;
        self.bridge.attempts.lock().remove(&self.platform);
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if let Some(prior) = self.prior.take() {
            debug!("[Connect] {} attempt released", self.platform);
            self.bridge.attempts.lock().remove(&self.platform);
            self.bridge.set_state(self.platform, prior);
        }
    }
}

/// Wait for the first of: a callback for `platform`, the popup closing, or
/// cancellation. Messages for other platforms are ignored.
async fn await_completion(
    platform: Platform,
    profile: &ProviderProfile,
    popup: &dyn PopupWindow,
    messages: &mut broadcast::Receiver<Value>,
    cancel: &CancellationToken,
) -> Completion {
    let mut poll = interval_at(
        Instant::now() + profile.poll_interval,
        profile.poll_interval,
    );
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut listening = true;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => return Completion::Cancelled,

            received = messages.recv(), if listening => match received {
                Ok(payload) => {
                    if let Some(message) = CallbackMessage::parse_for(platform, &payload) {
                        return Completion::Callback(message);
                    }
                    debug!("[Connect] Ignoring message for another receiver");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("[Connect] Message listener lagged, skipped {}", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => listening = false,
            },

            _ = poll.tick() => {
                if popup.is_closed() {
                    return Completion::PopupClosed;
                }
            }
        }
    }
}

/// JavaScript truthiness of a JSON value
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
