//! OAuth provider profiles
//!
//! Everything that differs between the LinkedIn and Instagram connect flows:
//! authorization endpoint, scopes and how they are joined, popup size, and the
//! timings of the popup-closed fallback.

use std::time::Duration;

use postingexpert_core::Platform;
use url::Url;

use crate::config::OAuthClientCredentials;

const LINKEDIN_AUTHORIZE_URL: &str = "https://www.linkedin.com/oauth/v2/authorization";
const INSTAGRAM_AUTHORIZE_URL: &str = "https://www.facebook.com/v21.0/dialog/oauth";

const LINKEDIN_SCOPES: &[&str] = &[
    "r_basicprofile",
    "w_member_social",
    "r_organization_social",
    "w_organization_social",
    "rw_organization_admin",
    "r_organization_followers",
    "r_organization_social_feed",
    "w_organization_social_feed",
    "r_member_profileAnalytics",
    "r_member_postAnalytics",
];

// Instagram business publishing goes through Facebook Login with page scopes
const INSTAGRAM_SCOPES: &[&str] = &[
    "pages_show_list",
    "pages_read_engagement",
    "instagram_basic",
    "instagram_content_publish",
    "business_management",
];

/// How one platform's authorization popup is opened and watched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub platform: Platform,
    pub authorize_url: &'static str,
    pub scopes: &'static [&'static str],
    pub scope_separator: &'static str,
    /// Popup window name
    pub window_name: &'static str,
    pub popup_width: u32,
    pub popup_height: u32,
    /// How often the popup is checked for `closed`
    pub poll_interval: Duration,
    /// Wait between popup closed and the status refresh
    pub refresh_delay: Duration,
}

impl ProviderProfile {
    pub fn linkedin() -> Self {
        Self {
            platform: Platform::LinkedIn,
            authorize_url: LINKEDIN_AUTHORIZE_URL,
            scopes: LINKEDIN_SCOPES,
            scope_separator: " ",
            window_name: "linkedin-auth",
            popup_width: 600,
            popup_height: 700,
            poll_interval: Duration::from_millis(1000),
            refresh_delay: Duration::from_millis(800),
        }
    }

    pub fn instagram() -> Self {
        Self {
            platform: Platform::Instagram,
            authorize_url: INSTAGRAM_AUTHORIZE_URL,
            scopes: INSTAGRAM_SCOPES,
            scope_separator: ",",
            window_name: "instagram-auth",
            popup_width: 600,
            popup_height: 720,
            poll_interval: Duration::from_millis(800),
            refresh_delay: Duration::from_millis(700),
        }
    }

    /// Profile for a platform; Facebook has none
    pub fn for_platform(platform: Platform) -> Option<Self> {
        match platform {
            Platform::LinkedIn => Some(Self::linkedin()),
            Platform::Instagram => Some(Self::instagram()),
            Platform::Facebook => None,
        }
    }

    /// Override the popup timings
    pub fn with_timing(mut self, poll_interval: Duration, refresh_delay: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.refresh_delay = refresh_delay;
        self
    }

    /// Scope parameter value
    pub fn scope(&self) -> String {
        self.scopes.join(self.scope_separator)
    }

    /// Authorization URL with `state` set to the app user
    pub fn authorization_url(
        &self,
        credentials: &OAuthClientCredentials,
        app_user: &str,
    ) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(self.authorize_url)?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &credentials.client_id)
            .append_pair("redirect_uri", &credentials.redirect_uri)
            .append_pair("state", app_user)
            .append_pair("scope", &self.scope());
        Ok(url)
    }
}
