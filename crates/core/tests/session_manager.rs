//! Integration tests for the token lifecycle manager
//!
//! Refresh-chain timing runs on paused tokio time.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use greenwindow_core::testing::{MemorySettingsStore, ScriptedTokenEndpoint};
use greenwindow_core::{AccessTokenProvider, RefreshOutcome, TokenLifecycleManager};
use greenwindow_domain::{Credentials, GreenWindowError, Session};
use tokio_util::sync::CancellationToken;

fn session(access: &str, refresh: Option<&str>, expires_in: Option<i64>) -> Session {
    Session {
        access_token: access.to_string(),
        refresh_token: refresh.map(str::to_string),
        expires_in,
        issued_at: Utc::now(),
    }
}

fn credentials() -> Credentials {
    Credentials::new("jan@example.nl", "correct horse")
}

struct Harness {
    endpoint: Arc<ScriptedTokenEndpoint>,
    settings: Arc<MemorySettingsStore>,
    manager: Arc<TokenLifecycleManager>,
}

fn harness() -> Harness {
    let endpoint = Arc::new(ScriptedTokenEndpoint::new());
    let settings = Arc::new(MemorySettingsStore::new());
    let manager = Arc::new(TokenLifecycleManager::new(endpoint.clone(), settings.clone()));
    Harness { endpoint, settings, manager }
}

#[tokio::test]
async fn credentials_are_persisted_even_when_rejected() {
    let h = harness();

    let err = h.manager.authenticate_with_credentials(&credentials()).await.unwrap_err();

    assert!(matches!(err, GreenWindowError::Auth(_)));
    assert_eq!(h.settings.value("username").as_deref(), Some("jan@example.nl"));
    assert_eq!(h.settings.value("password").as_deref(), Some("correct horse"));
    assert!(!h.manager.is_authenticated().await);
}

#[tokio::test]
async fn successful_login_exposes_access_token() {
    let h = harness();
    h.endpoint.push_password(Ok(session("access-1", Some("refresh-1"), Some(900))));

    h.manager.authenticate_with_credentials(&credentials()).await.unwrap();

    assert_eq!(h.manager.access_token().await.unwrap(), "access-1");
    assert_eq!(h.endpoint.password_calls(), vec!["jan@example.nl".to_string()]);
}

#[tokio::test]
async fn failed_refresh_falls_back_to_stored_credentials() {
    let h = harness();
    h.endpoint.push_password(Ok(session("access-1", Some("refresh-1"), Some(900))));
    h.manager.authenticate_with_credentials(&credentials()).await.unwrap();

    h.endpoint.push_refresh(Err(GreenWindowError::Auth("Token is not active".into())));
    h.endpoint.push_password(Ok(session("access-2", Some("refresh-2"), Some(600))));

    assert_eq!(h.manager.refresh().await.unwrap(), RefreshOutcome::Reauthenticated);
    assert_eq!(h.manager.access_token().await.unwrap(), "access-2");
    assert_eq!(h.manager.next_refresh_delay().await, Duration::from_secs(450));
    assert_eq!(h.endpoint.password_calls().len(), 2);
}

#[tokio::test]
async fn double_failure_keeps_stale_session() {
    let h = harness();
    h.endpoint.push_password(Ok(session("access-1", Some("refresh-1"), Some(120))));
    h.manager.authenticate_with_credentials(&credentials()).await.unwrap();

    h.endpoint.push_refresh(Err(GreenWindowError::Transient("connection reset".into())));
    h.endpoint.push_password(Err(GreenWindowError::Auth("Invalid user credentials".into())));

    let err = h.manager.refresh().await.unwrap_err();
    assert_eq!(err, GreenWindowError::Auth("Invalid user credentials".into()));
    assert_eq!(h.manager.access_token().await.unwrap(), "access-1");
    // 0.75 * 120 = 90s
    assert_eq!(h.manager.next_refresh_delay().await, Duration::from_secs(90));
}

#[tokio::test]
async fn fallback_without_stored_credentials_is_auth_error() {
    let endpoint = Arc::new(ScriptedTokenEndpoint::new());
    let manager = TokenLifecycleManager::new(endpoint, Arc::new(MemorySettingsStore::new()));

    let err = manager.refresh().await.unwrap_err();
    assert!(matches!(err, GreenWindowError::Auth(_)));
}

#[tokio::test(start_paused = true)]
async fn refresh_chain_fires_at_three_quarters_of_expiry() {
    let h = harness();
    h.endpoint.push_password(Ok(session("access-1", Some("refresh-1"), Some(300))));
    h.manager.authenticate_with_credentials(&credentials()).await.unwrap();
    h.endpoint.push_refresh(Ok(session("access-2", Some("refresh-2"), Some(300))));

    let cancel = CancellationToken::new();
    let task = tokio::spawn(Arc::clone(&h.manager).run_refresh_loop(cancel.clone()));

    tokio::time::sleep(Duration::from_secs(224)).await;
    assert!(h.endpoint.refresh_calls().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.endpoint.refresh_calls(), vec!["refresh-1".to_string()]);
    assert_eq!(h.manager.access_token().await.unwrap(), "access-2");

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn refresh_chain_survives_failed_cycles() {
    let h = harness();
    h.endpoint.push_password(Ok(session("access-1", Some("refresh-1"), Some(80))));
    h.manager.authenticate_with_credentials(&credentials()).await.unwrap();
    // Nothing else queued: every refresh and fallback fails.

    let cancel = CancellationToken::new();
    let task = tokio::spawn(Arc::clone(&h.manager).run_refresh_loop(cancel.clone()));

    // Floor of 60s applies (0.75 * 80 = 60); three cycles fit in 181s.
    tokio::time::sleep(Duration::from_secs(181)).await;

    assert_eq!(h.endpoint.refresh_calls().len(), 3);
    // One login plus one fallback per cycle.
    assert_eq!(h.endpoint.password_calls().len(), 4);
    assert!(!task.is_finished());

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn unauthenticated_chain_uses_default_expiry() {
    let h = harness();
    let cancel = CancellationToken::new();
    let task = tokio::spawn(Arc::clone(&h.manager).run_refresh_loop(cancel.clone()));

    tokio::time::sleep(Duration::from_secs(674)).await;
    assert!(h.endpoint.password_calls().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    // No refresh token and no stored credentials: the cycle fails before
    // reaching the endpoint, and the chain keeps running.
    assert!(h.endpoint.refresh_calls().is_empty());
    assert!(!task.is_finished());

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_chain_during_sleep() {
    let h = harness();
    let cancel = CancellationToken::new();
    let task = tokio::spawn(Arc::clone(&h.manager).run_refresh_loop(cancel.clone()));

    tokio::time::sleep(Duration::from_secs(10)).await;
    cancel.cancel();

    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("refresh chain should stop promptly")
        .unwrap();
}
