//! OAuth callback message posted from the provider popup to its opener

use serde_json::{Map, Value};

use super::{ConnectionStatus, Platform};

/// Keys that belong to the envelope rather than the platform detail
const ENVELOPE_KEYS: &[&str] = &["type", "success", "message", "error"];

/// Parsed `{ type: "<platform>_callback", success, ...fields, error? }` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackMessage {
    pub platform: Platform,
    pub success: bool,
    pub message: Option<String>,
    pub error: Option<String>,
    /// Platform-specific fields (posting method, URNs, usernames, ...)
    pub fields: Map<String, Value>,
}

impl CallbackMessage {
    /// Parse any posted payload.
    ///
    /// Accepts a JSON object or a JSON-encoded string. Returns `None` for
    /// payloads that are not callback messages; the message channel carries
    /// unrelated traffic too.
    pub fn parse(payload: &Value) -> Option<Self> {
        let decoded;
        let payload = match payload {
            Value::String(text) => {
                decoded = serde_json::from_str::<Value>(text).ok()?;
                &decoded
            }
            other => other,
        };

        let object = payload.as_object()?;
        let kind = object.get("type")?.as_str()?;
        let platform = kind.strip_suffix("_callback")?.parse::<Platform>().ok()?;

        let text = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let fields = object
            .iter()
            .filter(|(k, _)| !ENVELOPE_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Some(Self {
            platform,
            success: object.get("success").and_then(Value::as_bool) == Some(true),
            message: text("message"),
            error: text("error"),
            fields,
        })
    }

    /// Parse a payload only if it is addressed to `platform`
    pub fn parse_for(platform: Platform, payload: &Value) -> Option<Self> {
        Self::parse(payload).filter(|m| m.platform == platform)
    }

    /// Status implied by this message
    pub fn status(&self) -> ConnectionStatus {
        if !self.success {
            return ConnectionStatus::disconnected();
        }
        let detail = (!self.fields.is_empty()).then(|| Value::Object(self.fields.clone()));
        ConnectionStatus::connected(detail)
    }

    /// Error text, defaulting when the callback page sent none
    pub fn error_or_default(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| "Unknown error".to_string())
    }
}
