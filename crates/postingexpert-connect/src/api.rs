//! Backend REST client
//!
//! Thin wrapper over the PostingExpert API. Every call sends JSON and parses
//! the body leniently: an empty body is `null`, a non-JSON body is wrapped as
//! `{ "raw": text }`.

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use postingexpert_core::{normalize_status, ConnectionSnapshot, Platform, Session, UserProfile};

/// Phrases in an error message that mean the token was rejected
const AUTH_FAILURE_MARKERS: &[&str] = &["unauthorized", "token", "expired", "jwt", "forbidden"];

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("invalid request body: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Serialization(_) => None,
        }
    }

    /// `401`/`403`, or a message that talks about the token
    pub fn is_auth_failure(&self) -> bool {
        if matches!(self.status(), Some(401) | Some(403)) {
            return true;
        }
        let message = self.to_string().to_lowercase();
        AUTH_FAILURE_MARKERS.iter().any(|m| message.contains(m))
    }
}

/// `POST /register` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub brand_name: String,
    pub business_type: String,
    pub tone: String,
    pub goals: Vec<String>,
    pub ai_images: bool,
    pub frequency: String,
}

impl RegisterRequest {
    /// At most this many content goals are sent
    pub const MAX_GOALS: usize = 3;

    pub fn new(
        full_name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        brand_name: impl Into<String>,
    ) -> Self {
        let full_name = full_name.into().trim().to_string();
        Self {
            username: full_name.clone(),
            full_name,
            email: email.into().trim().to_string(),
            password: password.into(),
            brand_name: brand_name.into().trim().to_string(),
            ai_images: true,
            frequency: "5wk".to_string(),
            ..Self::default()
        }
    }

    pub fn with_business_type(mut self, business_type: impl Into<String>) -> Self {
        self.business_type = business_type.into();
        self
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = tone.into();
        self
    }

    pub fn with_goals<I, S>(mut self, goals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.goals = goals
            .into_iter()
            .map(Into::into)
            .take(Self::MAX_GOALS)
            .collect();
        self
    }

    pub fn with_frequency(mut self, frequency: impl Into<String>) -> Self {
        self.frequency = frequency.into();
        self
    }

    pub fn with_ai_images(mut self, enabled: bool) -> Self {
        self.ai_images = enabled;
        self
    }
}

/// `POST /login` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into().trim().to_string(),
            password: password.into(),
        }
    }
}

/// Token-bearing response of register/login
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthResponse {
    pub token: Option<String>,
    pub username: Option<String>,
    pub user_id: Option<String>,
    pub expires_in: Option<i64>,
}

impl AuthResponse {
    /// Extract from a response body.
    ///
    /// The token may be named `token`, `access_token`, `jwt` or nested as
    /// `data.token`; the first non-empty one wins.
    pub fn from_value(body: &Value) -> Self {
        let token = [
            body.get("token"),
            body.get("access_token"),
            body.get("jwt"),
            body.get("data").and_then(|d| d.get("token")),
        ]
        .into_iter()
        .flatten()
        .find_map(non_empty_str);

        Self {
            token,
            username: body.get("username").and_then(non_empty_str),
            user_id: body.get("user_id").and_then(scalar_string),
            expires_in: body.get("expires_in").and_then(|v| {
                v.as_i64()
                    .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
            }),
        }
    }

    /// Session for this response, with `fallback_username` when the backend
    /// did not echo one. `None` without a token.
    pub fn into_session(self, fallback_username: &str) -> Option<Session> {
        let mut session = Session::new(self.token?);
        match self.username {
            Some(username) => session = session.with_username(username),
            None if !fallback_username.trim().is_empty() => {
                session = session.with_username(fallback_username.trim())
            }
            None => {}
        }
        if let Some(user_id) = self.user_id {
            session = session.with_user_id(user_id);
        }
        if let Some(secs) = self.expires_in.filter(|s| *s > 0) {
            session = session.with_expires_in(secs);
        }
        Some(session)
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Ids may come back as numbers
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        other => non_empty_str(other),
    }
}

/// Parse a response body the lenient way
pub(crate) fn parse_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "raw": text }))
}

/// Error message carried by a failed response
pub(crate) fn error_message(body: &Value, status: StatusCode) -> String {
    ["error", "message"]
        .iter()
        .find_map(|key| body.get(key).and_then(non_empty_str))
        .unwrap_or_else(|| format!("Request failed ({})", status.as_u16()))
}

/// PostingExpert backend client
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

impl ApiClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self::with_http_client(base, reqwest::Client::new())
    }

    pub fn with_http_client(base: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<(StatusCode, Value), ApiError> {
        debug!("[Api] {} {}", method, path);
        let mut request = self
            .http
            .request(method, self.url(path))
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        Ok((status, parse_body(&text)))
    }

    /// Send a request and fail on non-2xx
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<Value, ApiError> {
        let (status, data) = self.send(method, path, body, token).await?;
        if !status.is_success() {
            let message = error_message(&data, status);
            warn!("[Api] {} -> {}: {}", path, status.as_u16(), message);
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(data)
    }

    pub async fn register(&self, payload: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let body = serde_json::to_value(payload)?;
        let data = self
            .request(Method::POST, "/register", Some(&body), None)
            .await?;
        Ok(AuthResponse::from_value(&data))
    }

    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let body = json!({
            "username": credentials.username,
            "password": credentials.password,
        });
        let data = self.request(Method::POST, "/login", Some(&body), None).await?;
        Ok(AuthResponse::from_value(&data))
    }

    /// Raw `/user/profile` body
    pub async fn profile(&self, token: &str) -> Result<Value, ApiError> {
        self.request(Method::GET, "/user/profile", None, Some(token))
            .await
    }

    /// `/user/profile` normalized with stored fallbacks
    pub async fn user_profile(
        &self,
        token: &str,
        stored_username: Option<&str>,
        stored_brand: Option<&str>,
    ) -> Result<UserProfile, ApiError> {
        let body = self.profile(token).await?;
        Ok(UserProfile::from_response(
            &body,
            stored_username,
            stored_brand,
        ))
    }

    /// Authoritative connection status of every platform
    pub async fn social_status(
        &self,
        token: &str,
        app_user: &str,
    ) -> Result<ConnectionSnapshot, ApiError> {
        let path = format!(
            "/social/status?app_user={}",
            urlencoding::encode(app_user)
        );
        let body = self.request(Method::GET, &path, None, Some(token)).await?;
        Ok(normalize_status(&body))
    }

    /// `POST /social/<platform>/disconnect`.
    ///
    /// Returns the raw status and body; the caller distinguishes an expired
    /// token from other failures.
    pub async fn disconnect(
        &self,
        token: &str,
        platform: Platform,
        app_user: &str,
    ) -> Result<(StatusCode, Value), ApiError> {
        let path = format!("/social/{}/disconnect", platform.as_str());
        let body = json!({
            "app_user": app_user,
            "platform": platform.as_str(),
        });
        self.send(Method::POST, &path, Some(&body), Some(token)).await
    }
}
