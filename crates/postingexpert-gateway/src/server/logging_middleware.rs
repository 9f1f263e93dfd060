//! Request logging for the proxy routes
//!
//! One entry and one exit line per request, tagged with a trace id. Bodies go
//! to DEBUG with credential fields masked.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tracing::{debug, warn, Instrument};

use crate::logging::TraceContext;

/// Bodies longer than this are summarized by size
const MAX_LOGGED_BODY: usize = 4 * 1024;

/// Paths whose non-JSON bodies are never printed
const CREDENTIAL_PATHS: &[&str] = &["/login", "/register", "/disconnect"];

/// JSON fields masked wherever they appear
const SECRET_FIELDS: &[&str] = &["password", "token", "access_token", "jwt", "code"];

/// Headers worth seeing when debugging the proxy
const LOGGED_HEADERS: &[&str] = &["content-type", "accept", "origin", "authorization", "cookie"];

pub fn is_credential_path(path: &str) -> bool {
    CREDENTIAL_PATHS.iter().any(|p| path.contains(p))
}

fn header_summary(headers: &HeaderMap) -> String {
    LOGGED_HEADERS
        .iter()
        .filter_map(|name| {
            let value = headers.get(*name)?;
            Some(match *name {
                "authorization" | "cookie" => format!("{}=<set>", name),
                _ => format!("{}={}", name, value.to_str().unwrap_or("<binary>")),
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn mask_secrets(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if SECRET_FIELDS.contains(&key.as_str()) {
                    *field = Value::String("***".to_string());
                } else {
                    mask_secrets(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask_secrets),
        _ => {}
    }
}

/// Render a body for a log line
pub fn describe_body(bytes: &[u8], credential_path: bool) -> String {
    if bytes.is_empty() {
        return "<empty>".to_string();
    }
    if bytes.len() > MAX_LOGGED_BODY {
        return format!("<{} bytes>", bytes.len());
    }
    if let Ok(mut json) = serde_json::from_slice::<Value>(bytes) {
        mask_secrets(&mut json);
        return json.to_string();
    }
    if credential_path {
        return format!("<{} bytes withheld>", bytes.len());
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<{} binary bytes>", bytes.len()),
    }
}

async fn buffer(body: Body, ctx: &TraceContext, what: &str) -> Result<Bytes, StatusCode> {
    match body.collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) => {
            warn!(trace_id = %ctx.trace_id, "[Gateway] Failed to read {} body: {}", what, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Trace-id tagged entry/exit logging around every route
pub async fn http_logging_middleware(request: Request, next: Next) -> Result<Response, StatusCode> {
    let ctx = TraceContext::new(request.method(), request.uri().path());
    let credential_path = is_credential_path(&ctx.path);
    let span = ctx.span();

    async move {
        ctx.log_entry();
        debug!(
            trace_id = %ctx.trace_id,
            headers = %header_summary(request.headers()),
            "[Gateway] Request headers"
        );

        let (parts, body) = request.into_parts();
        let bytes = buffer(body, &ctx, "request").await?;
        if !bytes.is_empty() {
            debug!(
                trace_id = %ctx.trace_id,
                body = %describe_body(&bytes, credential_path),
                "[Gateway] Request body"
            );
        }

        let response = next
            .run(Request::from_parts(parts, Body::from(bytes)))
            .await;

        let (parts, body) = response.into_parts();
        let bytes = buffer(body, &ctx, "response").await?;
        debug!(
            trace_id = %ctx.trace_id,
            body = %describe_body(&bytes, credential_path),
            "[Gateway] Response body"
        );
        ctx.log_exit(parts.status);

        Ok(Response::from_parts(parts, Body::from(bytes)))
    }
    .instrument(span)
    .await
}
