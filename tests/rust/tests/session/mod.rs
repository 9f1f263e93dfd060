//! Session persistence tests
//!
//! File-backed storage across context restarts.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use postingexpert_core::session::keys;
use postingexpert_core::{
    DomainEvent, EventBus, FileSessionStorage, Session, SessionContext, SessionEndReason,
    SessionStorage,
};
use tests::events::wait_for_event;

/// Epoch millis `secs` seconds ago
fn past(secs: i64) -> String {
    (Utc::now() - ChronoDuration::seconds(secs))
        .timestamp_millis()
        .to_string()
}

async fn file_context(dir: &TempDir) -> (SessionContext, Arc<FileSessionStorage>) {
    let storage = Arc::new(
        FileSessionStorage::open(dir.path().join("state").join("session.json"))
            .await
            .unwrap(),
    );
    (SessionContext::new(storage.clone()), storage)
}

#[tokio::test]
async fn test_session_survives_restart() {
    let dir = TempDir::new().unwrap();
    {
        let (context, _) = file_context(&dir).await;
        context
            .sign_in(
                Session::new("persisted")
                    .with_username("jane")
                    .with_user_id("u1")
                    .with_expires_in(3600),
            )
            .await
            .unwrap();
    }

    let (context, _) = file_context(&dir).await;
    let restored = context.restore().await.unwrap().unwrap();

    assert_eq!(restored.token, "persisted");
    assert_eq!(restored.username.as_deref(), Some("jane"));
    assert_eq!(context.app_user().await.as_deref(), Some("jane"));
    assert!(context.is_authenticated());
}

#[tokio::test]
async fn test_document_uses_well_known_keys() {
    let dir = TempDir::new().unwrap();
    let (context, storage) = file_context(&dir).await;
    context
        .sign_in(Session::new("abc").with_username("jane").with_expires_in(60))
        .await
        .unwrap();
    context.set_brand_name("Acme").await.unwrap();

    let raw = std::fs::read_to_string(storage.path()).unwrap();
    let document: serde_json::Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(document[keys::TOKEN], "abc");
    assert_eq!(document[keys::USERNAME], "jane");
    assert_eq!(document[keys::BRAND_NAME], "Acme");
    assert!(document[keys::TOKEN_EXPIRY]
        .as_str()
        .and_then(|s| s.parse::<i64>().ok())
        .is_some());
}

#[tokio::test]
async fn test_expired_session_is_cleared_on_restore() {
    let dir = TempDir::new().unwrap();
    let (_, storage) = file_context(&dir).await;
    storage.set(keys::TOKEN, "stale").await.unwrap();
    storage.set(keys::TOKEN_EXPIRY, &past(60)).await.unwrap();
    storage.set(keys::USERNAME, "jane").await.unwrap();
    storage.set(keys::BRAND_NAME, "Acme").await.unwrap();

    let (context, storage) = file_context(&dir).await;
    assert!(context.restore().await.unwrap().is_none());

    assert!(storage.get(keys::TOKEN).await.unwrap().is_none());
    assert!(storage.get(keys::USERNAME).await.unwrap().is_none());
    assert_eq!(
        storage.get(keys::BRAND_NAME).await.unwrap().as_deref(),
        Some("Acme")
    );
}

#[tokio::test]
async fn test_token_expiry_signs_out() {
    let bus = EventBus::new();
    let mut rx = bus.subscribe();
    let context = SessionContext::in_memory().with_events(bus.sender());
    context
        .sign_in(Session::new("short").with_expires_at(Utc::now() - ChronoDuration::seconds(1)))
        .await
        .unwrap();

    assert_eq!(context.token().await, None);
    assert!(context.current().is_none());

    let ended = wait_for_event(&mut rx, Duration::from_millis(200), |e| {
        matches!(e, DomainEvent::SessionEnded { .. })
    })
    .await;
    assert_eq!(
        ended,
        Some(DomainEvent::SessionEnded {
            reason: SessionEndReason::Expired
        })
    );
}
