//! Connect flow tests

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use postingexpert_connect::{ConnectBridge, ConnectConfig, ConnectError, ConnectOutcome, NoticeLevel};
use postingexpert_core::{ConnectionState, EventBus, Platform, Session, SessionContext};
use tests::events::{collect_events, count_connected};
use tests::fixtures::{signed_in_session, TEST_USERNAME};
use tests::FakeHost;

use super::bridge;

async fn mount_status(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/social/status"))
        .and(query_param("app_user", TEST_USERNAME))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn wait_for_state(bridge: &ConnectBridge, platform: Platform, state: ConnectionState) {
    for _ in 0..200 {
        if bridge.state(platform) == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("{} never reached {:?}", platform, state);
}

#[tokio::test]
async fn test_connect_without_app_user_redirects_to_login() {
    let host = Arc::new(FakeHost::new());
    let bus = EventBus::new();
    let bridge = bridge(
        "http://127.0.0.1:9",
        Arc::new(SessionContext::in_memory()),
        host.clone(),
        &bus,
    );

    let result = bridge.connect(Platform::LinkedIn).await;

    assert!(matches!(result, Err(ConnectError::NotAuthenticated)));
    assert!(host.opened().is_empty());
    assert_eq!(host.redirects(), vec!["/login".to_string()]);
    assert_eq!(bridge.state(Platform::LinkedIn), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_popup_blocked_restores_state() {
    let host = Arc::new(FakeHost::new().blocking_popups());
    let bus = EventBus::new();
    let bridge = bridge("http://127.0.0.1:9", signed_in_session().await, host.clone(), &bus);

    let result = bridge.connect(Platform::Instagram).await;

    assert!(matches!(result, Err(ConnectError::PopupBlocked)));
    assert_eq!(bridge.state(Platform::Instagram), ConnectionState::Disconnected);
    let warnings = host.notices_at(NoticeLevel::Warning);
    assert!(warnings[0].starts_with("Popup blocked"));
}

#[tokio::test]
async fn test_unconfigured_platform_opens_no_popup() {
    let host = Arc::new(FakeHost::new());
    let bridge = ConnectBridge::new(
        ConnectConfig::new("http://127.0.0.1:9"),
        signed_in_session().await,
        host.clone(),
    );

    let result = bridge.connect(Platform::LinkedIn).await;

    assert!(matches!(
        result,
        Err(ConnectError::NotConfigured(Platform::LinkedIn))
    ));
    assert!(host.opened().is_empty());
    assert_eq!(host.notices_at(NoticeLevel::Error).len(), 1);
}

#[tokio::test]
async fn test_facebook_connect_is_unsupported() {
    let host = Arc::new(FakeHost::new());
    let bus = EventBus::new();
    let bridge = bridge("http://127.0.0.1:9", signed_in_session().await, host.clone(), &bus);

    let result = bridge.connect(Platform::Facebook).await;

    assert!(matches!(
        result,
        Err(ConnectError::Unsupported(Platform::Facebook))
    ));
    assert!(host.opened().is_empty());
}

#[tokio::test]
async fn test_callback_success_connects_exactly_once() {
    let server = MockServer::start().await;
    mount_status(
        &server,
        json!({"linkedin": {"connected": true, "detail": {"posting_method": "organization"}}}),
    )
    .await;

    let host = Arc::new(FakeHost::new());
    let bus = EventBus::new();
    let mut rx = bus.subscribe();
    let bridge = bridge(&server.uri(), signed_in_session().await, host.clone(), &bus);
    host.post_on_open(
        bridge.messages(),
        json!({
            "type": "linkedin_callback",
            "success": true,
            "posting_method": "organization",
            "org_urn": "urn:li:organization:1",
            "message": "Connected as Acme"
        }),
    );

    let outcome = bridge.connect(Platform::LinkedIn).await.unwrap();

    let ConnectOutcome::Connected(status) = outcome else {
        panic!("expected Connected, got {:?}", outcome);
    };
    assert!(status.connected);
    assert_eq!(
        status.detail.as_ref().unwrap()["org_urn"],
        json!("urn:li:organization:1")
    );
    assert_eq!(bridge.state(Platform::LinkedIn), ConnectionState::Connected);
    assert_eq!(host.notices_at(NoticeLevel::Success), vec!["Connected as Acme"]);

    // The authoritative refresh reports the same connection
    bridge.refresh_status().await.unwrap();
    assert_eq!(bridge.connected_count(), 1);

    let events = collect_events(&mut rx, Duration::from_millis(50)).await;
    assert_eq!(count_connected(&events, Platform::LinkedIn), 1);
}

#[tokio::test]
async fn test_authorization_popup_parameters() {
    let host = Arc::new(FakeHost::new());
    let bus = EventBus::new();
    let bridge = bridge("http://127.0.0.1:9", signed_in_session().await, host.clone(), &bus);
    host.post_on_open(
        bridge.messages(),
        json!({"type": "linkedin_callback", "success": true}),
    );

    bridge.connect(Platform::LinkedIn).await.unwrap();

    let opened = host.opened();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].name, "linkedin-auth");
    assert_eq!((opened[0].geometry.width, opened[0].geometry.height), (600, 700));
    assert_eq!(opened[0].url.host_str(), Some("www.linkedin.com"));

    let params: HashMap<String, String> = opened[0].url.query_pairs().into_owned().collect();
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["client_id"], "li-client");
    assert_eq!(params["state"], TEST_USERNAME);
    assert_eq!(
        params["redirect_uri"],
        "https://app.example.com/social/linkedin/callback"
    );
}

#[tokio::test]
async fn test_string_encoded_callback_is_accepted() {
    let host = Arc::new(FakeHost::new());
    let bus = EventBus::new();
    let bridge = bridge("http://127.0.0.1:9", signed_in_session().await, host.clone(), &bus);
    host.post_on_open(
        bridge.messages(),
        json!(r#"{"type":"instagram_callback","success":true,"username":"acme"}"#),
    );

    let outcome = bridge.connect(Platform::Instagram).await.unwrap();

    assert!(matches!(outcome, ConnectOutcome::Connected(_)));
    assert!(bridge.snapshot().is_connected(Platform::Instagram));
    assert_eq!(
        bridge.snapshot().get(Platform::Instagram).summary(Platform::Instagram),
        "@acme"
    );

    let opened = host.opened();
    assert_eq!(opened[0].url.host_str(), Some("www.facebook.com"));
    let params: HashMap<String, String> = opened[0].url.query_pairs().into_owned().collect();
    assert!(params["scope"].contains("instagram_content_publish,business_management"));
}

#[tokio::test]
async fn test_callback_failure_marks_failed() {
    let host = Arc::new(FakeHost::new());
    let bus = EventBus::new();
    let bridge = bridge("http://127.0.0.1:9", signed_in_session().await, host.clone(), &bus);
    host.post_on_open(
        bridge.messages(),
        json!({"type": "linkedin_callback", "success": false}),
    );

    let outcome = bridge.connect(Platform::LinkedIn).await.unwrap();

    assert_eq!(
        outcome,
        ConnectOutcome::Failed {
            error: "Unknown error".to_string()
        }
    );
    assert_eq!(
        bridge.state(Platform::LinkedIn),
        ConnectionState::Failed {
            error: "Unknown error".to_string()
        }
    );
    assert_eq!(
        host.notices_at(NoticeLevel::Error),
        vec!["LinkedIn connection failed: Unknown error"]
    );
    assert_eq!(bridge.connected_count(), 0);
}

#[tokio::test]
async fn test_popup_closed_falls_back_to_status_refresh() {
    let server = MockServer::start().await;
    mount_status(
        &server,
        json!({"status": {"linkedin": {"is_connected": true}, "instagram": false}}),
    )
    .await;

    let host = Arc::new(FakeHost::new().closing_on_open());
    let bus = EventBus::new();
    let mut rx = bus.subscribe();
    let bridge = bridge(&server.uri(), signed_in_session().await, host.clone(), &bus);
    // Traffic for another platform must not complete the LinkedIn attempt
    host.post_on_open(
        bridge.messages(),
        json!({"type": "instagram_callback", "success": true}),
    );

    let outcome = bridge.connect(Platform::LinkedIn).await.unwrap();

    assert_eq!(outcome, ConnectOutcome::Closed { connected: true });
    assert_eq!(bridge.state(Platform::LinkedIn), ConnectionState::Connected);
    assert!(!bridge.snapshot().is_connected(Platform::Instagram));

    let events = collect_events(&mut rx, Duration::from_millis(50)).await;
    assert_eq!(count_connected(&events, Platform::LinkedIn), 1);
    assert_eq!(count_connected(&events, Platform::Instagram), 0);
}

#[tokio::test]
async fn test_cancellation_aborts_attempt() {
    let host = Arc::new(FakeHost::new());
    let bus = EventBus::new();
    let bridge = bridge("http://127.0.0.1:9", signed_in_session().await, host.clone(), &bus);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let outcome = bridge
        .connect_with_cancel(Platform::LinkedIn, cancel)
        .await
        .unwrap();

    assert_eq!(outcome, ConnectOutcome::Cancelled);
    assert!(host.popup_is_closed());
    assert_eq!(bridge.state(Platform::LinkedIn), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_dropped_connect_releases_platform() {
    let host = Arc::new(FakeHost::new());
    let bus = EventBus::new();
    let bridge = bridge("http://127.0.0.1:9", signed_in_session().await, host.clone(), &bus);

    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), bridge.connect(Platform::LinkedIn)).await;
    assert!(abandoned.is_err());

    assert_eq!(bridge.state(Platform::LinkedIn), ConnectionState::Disconnected);
    assert!(!bridge.cancel(Platform::LinkedIn));

    host.post_on_open(
        bridge.messages(),
        json!({"type": "linkedin_callback", "success": true}),
    );
    let outcome = bridge.connect(Platform::LinkedIn).await.unwrap();

    assert!(matches!(outcome, ConnectOutcome::Connected(_)));
    assert_eq!(host.opened().len(), 2);
    assert_eq!(bridge.state(Platform::LinkedIn), ConnectionState::Connected);
}

#[tokio::test]
async fn test_connect_with_expired_session_redirects_to_login() {
    let host = Arc::new(FakeHost::new());
    let bus = EventBus::new();
    let session = SessionContext::in_memory();
    session
        .sign_in(
            Session::new("stale")
                .with_username(TEST_USERNAME)
                .with_expires_at(Utc::now() - chrono::Duration::seconds(1)),
        )
        .await
        .unwrap();
    let session = Arc::new(session);
    let bridge = bridge("http://127.0.0.1:9", session.clone(), host.clone(), &bus);

    let result = bridge.connect(Platform::LinkedIn).await;

    assert!(matches!(result, Err(ConnectError::NotAuthenticated)));
    assert!(host.opened().is_empty());
    assert!(session.current().is_none());
    assert_eq!(host.redirects(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn test_second_connect_while_busy_is_rejected() {
    let host = Arc::new(FakeHost::new());
    let bus = EventBus::new();
    let bridge = Arc::new(bridge(
        "http://127.0.0.1:9",
        signed_in_session().await,
        host.clone(),
        &bus,
    ));

    let first = {
        let bridge = bridge.clone();
        tokio::spawn(async move { bridge.connect(Platform::LinkedIn).await })
    };
    wait_for_state(&bridge, Platform::LinkedIn, ConnectionState::Connecting).await;

    let second = bridge.connect(Platform::LinkedIn).await;
    assert!(matches!(
        second,
        Err(ConnectError::AlreadyInProgress(Platform::LinkedIn))
    ));

    assert!(bridge.cancel(Platform::LinkedIn));
    let outcome = first.await.unwrap().unwrap();
    assert_eq!(outcome, ConnectOutcome::Cancelled);
    assert_eq!(host.opened().len(), 1);
}

#[tokio::test]
async fn test_rejected_status_refresh_ends_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/social/status"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "jwt expired"})))
        .mount(&server)
        .await;

    let host = Arc::new(FakeHost::new());
    let bus = EventBus::new();
    let session = signed_in_session().await;
    let bridge = bridge(&server.uri(), session.clone(), host.clone(), &bus);

    let result = bridge.refresh_status().await;

    assert!(result.is_err_and(|e| e.requires_login()));
    assert!(session.current().is_none());
    assert_eq!(host.redirects(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn test_status_envelopes_are_normalized() {
    let server = MockServer::start().await;
    mount_status(
        &server,
        json!({"connected": {"linkedin": true, "instagram": {"connected": true}, "facebook": "yes"}}),
    )
    .await;

    let host = Arc::new(FakeHost::new());
    let bus = EventBus::new();
    let bridge = bridge(&server.uri(), signed_in_session().await, host, &bus);

    let snapshot = bridge.refresh_status().await.unwrap();

    assert!(snapshot.is_connected(Platform::LinkedIn));
    assert!(snapshot.is_connected(Platform::Instagram));
    assert!(!snapshot.is_connected(Platform::Facebook));
    assert_eq!(bridge.connected_count(), 2);
}
