//! Account flows
//!
//! Register, login, logout and the dashboard profile, with the session
//! context as the single place credentials are kept.

use std::sync::Arc;

use tracing::{info, warn};

use postingexpert_core::{branding, SessionContext, SessionEndReason, UserProfile};

use crate::api::{ApiClient, LoginRequest, RegisterRequest};
use crate::error::{ConnectError, Result};

/// Where the UI goes after register/login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    /// A session was started
    pub signed_in: bool,
    /// App path to navigate to
    pub next_path: &'static str,
}

pub struct AccountService {
    api: ApiClient,
    session: Arc<SessionContext>,
}

impl AccountService {
    pub fn new(api: ApiClient, session: Arc<SessionContext>) -> Self {
        Self { api, session }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// Create an account.
    ///
    /// Brand and business type are stored right away. When the backend returns
    /// a token the user is signed in and sent to `/connect`, otherwise to
    /// `/login`.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthOutcome> {
        let response = self.api.register(request).await?;

        self.session.set_brand_name(&request.brand_name).await?;
        self.session
            .set_business_type(&request.business_type)
            .await?;

        match response.into_session(&request.full_name) {
            Some(session) => {
                info!(username = ?session.username, "[Account] Registered and signed in");
                self.session.sign_in(session).await?;
                Ok(AuthOutcome {
                    signed_in: true,
                    next_path: branding::CONNECT_PATH,
                })
            }
            None => {
                info!("[Account] Registered without a token, login required");
                Ok(AuthOutcome {
                    signed_in: false,
                    next_path: branding::LOGIN_PATH,
                })
            }
        }
    }

    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthOutcome> {
        let response = self.api.login(credentials).await?;
        let Some(session) = response.into_session(&credentials.username) else {
            warn!("[Account] Login response carried no token");
            return Err(ConnectError::NotAuthenticated);
        };
        self.session.sign_in(session).await?;
        Ok(AuthOutcome {
            signed_in: true,
            next_path: branding::CONNECT_PATH,
        })
    }

    /// Clear the session; the stored brand survives
    pub async fn logout(&self) -> Result<&'static str> {
        self.session.sign_out(SessionEndReason::Logout).await?;
        Ok(branding::LOGIN_PATH)
    }

    /// Dashboard profile.
    ///
    /// Falls back to stored values when the backend cannot be reached. A
    /// rejected token ends the session instead.
    pub async fn load_profile(&self) -> Result<UserProfile> {
        let Some(token) = self.session.token().await else {
            return Err(ConnectError::NotAuthenticated);
        };
        let username = self.session.current().and_then(|s| s.username);
        let stored_brand = self.session.brand_name().await?;

        match self
            .api
            .user_profile(&token, username.as_deref(), stored_brand.as_deref())
            .await
        {
            Ok(profile) => {
                self.session.set_brand_name(&profile.brand_name).await?;
                Ok(profile)
            }
            Err(e) if e.is_auth_failure() => {
                warn!("[Account] Profile request rejected: {}", e);
                self.session.sign_out(SessionEndReason::Rejected).await?;
                Err(e.into())
            }
            Err(e) => {
                warn!("[Account] Profile unavailable, using stored values: {}", e);
                Ok(UserProfile::fallback(
                    username.as_deref(),
                    stored_brand.as_deref(),
                ))
            }
        }
    }
}
