//! Proxy route handlers

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE,
            HOST, TRANSFER_ENCODING,
        },
        HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
};
use tracing::debug;
use url::Url;

use super::{build_target_url, ProxyError, ProxyState};

/// Route prefix of the gateway proxy
const API_PREFIX: &str = "/api";

/// Route prefix of the queue proxy
const QUEUE_PREFIX: &str = "/api/queue";

pub const CORS_ALLOW_METHODS: &str = "GET,POST,PUT,DELETE,OPTIONS";
pub const CORS_ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Forward any request under `/api` to the API Gateway.
///
/// `OPTIONS` is answered locally with a permissive preflight. Upstream status,
/// headers and body bytes are relayed unchanged, including error responses.
pub async fn gateway_proxy(
    State(state): State<ProxyState>,
    request: Request,
) -> Result<Response, ProxyError> {
    if request.method() == Method::OPTIONS {
        return Ok(preflight());
    }

    let (parts, body) = request.into_parts();
    let path = parts
        .uri
        .path()
        .strip_prefix(API_PREFIX)
        .unwrap_or(parts.uri.path());
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let upstream_cfg = &state.upstream;
    let target = build_target_url(
        &upstream_cfg.gateway_base,
        &upstream_cfg.stage,
        &segments,
        parts.uri.query(),
    )?;
    debug!("[Proxy] {} {} → {}", parts.method, parts.uri.path(), target);

    let mut headers = parts.headers.clone();
    headers.remove(HOST);
    headers.remove(CONTENT_LENGTH);

    let mut upstream = state
        .http
        .request(parts.method.clone(), target)
        .headers(headers);
    if parts.method != Method::GET && parts.method != Method::HEAD {
        let bytes = to_bytes(body, usize::MAX).await?;
        upstream = upstream.body(bytes);
    }

    let upstream = upstream.send().await?;
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    let bytes = upstream.bytes().await?;

    // The body is re-framed, so upstream framing headers no longer apply
    headers.remove(TRANSFER_ENCODING);
    headers.remove(CONNECTION);
    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    debug!("[Proxy] ← {} ({} bytes)", status, bytes.len());

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Forward `GET`/`POST` under `/api/queue` to the queue service.
///
/// Only `Authorization` is forwarded. `POST` bodies are sent as JSON text.
pub async fn queue_proxy(
    State(state): State<ProxyState>,
    request: Request,
) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();
    let path = parts
        .uri
        .path()
        .strip_prefix(QUEUE_PREFIX)
        .unwrap_or_default()
        .trim_start_matches('/');

    let target = Url::parse(&format!(
        "{}/queue/{}",
        state.upstream.queue_base.trim_end_matches('/'),
        path
    ))?;
    debug!("[Proxy] {} /queue/{} → {}", parts.method, path, target);

    let mut upstream = state.http.request(parts.method.clone(), target);
    if let Some(token) = parts.headers.get(AUTHORIZATION) {
        upstream = upstream.header(AUTHORIZATION, token.clone());
    }
    if parts.method == Method::POST {
        let bytes = to_bytes(body, usize::MAX).await?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        upstream = upstream.header(CONTENT_TYPE, "application/json").body(text);
    }

    let upstream = upstream.send().await?;
    let status = upstream.status();
    let text = upstream.text().await?;

    debug!("[Proxy] ← {} from queue", status);

    Ok((status, [(CONTENT_TYPE, "application/json")], text).into_response())
}

/// Static CORS preflight answer
fn preflight() -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (ACCESS_CONTROL_ALLOW_METHODS, CORS_ALLOW_METHODS),
            (ACCESS_CONTROL_ALLOW_HEADERS, CORS_ALLOW_HEADERS),
        ],
    )
        .into_response()
}
