//! Connect configuration

use postingexpert_core::{branding, Platform};

/// OAuth client registration for one platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthClientCredentials {
    pub client_id: String,
    pub redirect_uri: String,
}

impl OAuthClientCredentials {
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
        }
    }
}

/// Backend location and per-platform OAuth clients.
///
/// A platform without credentials cannot be connected; the bridge reports
/// that instead of opening a popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectConfig {
    /// REST API base (register, profile, social status, disconnect)
    pub api_base: String,
    pub linkedin: Option<OAuthClientCredentials>,
    pub instagram: Option<OAuthClientCredentials>,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            api_base: branding::DEFAULT_BACKEND_URL.to_string(),
            linkedin: None,
            instagram: None,
        }
    }
}

impl ConnectConfig {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `NEXT_PUBLIC_API_BASE` plus `NEXT_PUBLIC_<PLATFORM>_CLIENT_ID` and
    /// `NEXT_PUBLIC_<PLATFORM>_REDIRECT_URI`; both are required per platform.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let credentials = |prefix: &str| {
            let client_id = var(&format!("NEXT_PUBLIC_{}_CLIENT_ID", prefix))?;
            let redirect_uri = var(&format!("NEXT_PUBLIC_{}_REDIRECT_URI", prefix))?;
            Some(OAuthClientCredentials::new(client_id, redirect_uri))
        };

        Self {
            api_base: var("NEXT_PUBLIC_API_BASE")
                .unwrap_or_else(|| branding::DEFAULT_BACKEND_URL.to_string()),
            linkedin: credentials("LINKEDIN"),
            instagram: credentials("INSTAGRAM"),
        }
    }

    pub fn with_linkedin(mut self, credentials: OAuthClientCredentials) -> Self {
        self.linkedin = Some(credentials);
        self
    }

    pub fn with_instagram(mut self, credentials: OAuthClientCredentials) -> Self {
        self.instagram = Some(credentials);
        self
    }

    pub fn credentials(&self, platform: Platform) -> Option<&OAuthClientCredentials> {
        match platform {
            Platform::LinkedIn => self.linkedin.as_ref(),
            Platform::Instagram => self.instagram.as_ref(),
            Platform::Facebook => None,
        }
    }

    /// API base without a trailing slash
    pub fn api_base(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }
}
