//! Queue proxy tests

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_string, header as header_eq, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use postingexpert_gateway::UpstreamConfig;

use super::{body_json, send};

fn upstream(queue_base: &str) -> UpstreamConfig {
    UpstreamConfig::default().with_queue_base(queue_base)
}

#[tokio::test]
async fn test_get_forwards_authorization_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/queue/jobs/5"))
        .and(header_eq("authorization", "Bearer q"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"state":"queued"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let response = send(
        upstream(&server.uri()),
        Request::get("/api/queue/jobs/5")
            .header(header::AUTHORIZATION, "Bearer q")
            .header("x-request-source", "dashboard")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    assert_eq!(body_json(response).await, json!({"state": "queued"}));

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("x-request-source").is_none());
}

#[tokio::test]
async fn test_post_sends_body_as_json() {
    let server = MockServer::start().await;
    let payload = r#"{"post_id":"p1"}"#;
    Mock::given(method("POST"))
        .and(path("/queue/enqueue"))
        .and(header_eq("content-type", "application/json"))
        .and(body_string(payload))
        .respond_with(ResponseTemplate::new(202).set_body_string(r#"{"accepted":true}"#))
        .expect(1)
        .mount(&server)
        .await;

    let response = send(
        upstream(&server.uri()),
        Request::post("/api/queue/enqueue")
            .body(Body::from(payload))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(response).await, json!({"accepted": true}));

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_upstream_status_is_relayed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/queue/jobs/none"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"error":"no job"}"#))
        .mount(&server)
        .await;

    let response = send(
        upstream(&server.uri()),
        Request::get("/api/queue/jobs/none")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({"error": "no job"}));
}

#[tokio::test]
async fn test_unreachable_queue_returns_500_json() {
    let response = send(
        upstream("http://127.0.0.1:9"),
        Request::get("/api/queue/jobs").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let body = body_json(response).await;
    assert!(body["error"].is_string());
}
