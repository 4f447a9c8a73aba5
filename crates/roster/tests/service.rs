//! Integration tests for `SessionService`: the async lifecycle surface,
//! duplicate-login arbitration, concurrency, shutdown, and the reaper.
//!
//! Time-driven tests run with `start_paused = true` so the reaper's interval
//! and the inactive grace period advance deterministically.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::join_all;
use roster::prelude::*;

// =========================================================================
// Helpers
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
struct ConnData {
    connect_uid: String,
}

fn data(connect_uid: &str) -> ConnData {
    ConnData {
        connect_uid: connect_uid.to_string(),
    }
}

/// Hook log entries: `(hook name, uid, detail)`.
type Log = Arc<Mutex<Vec<(&'static str, u64, String)>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<(&'static str, u64, String)> {
    log.lock().unwrap().clone()
}

fn logging_hooks(log: &Log) -> EventHooks<u64, ConnData> {
    let l1 = Arc::clone(log);
    let l2 = Arc::clone(log);
    let l3 = Arc::clone(log);
    let l4 = Arc::clone(log);
    EventHooks::new()
        .on_logged_in(move |s: &Session<u64, ConnData>| {
            l1.lock()
                .unwrap()
                .push(("logged_in", s.uid, s.data.connect_uid.clone()));
        })
        .on_logged_out(move |s, reason| {
            l2.lock()
                .unwrap()
                .push(("logged_out", s.uid, reason.to_string()));
        })
        .on_unexpected_logged_out(move |s, reason| {
            l3.lock()
                .unwrap()
                .push(("unexpected", s.uid, reason.to_string()));
        })
        .on_relogged_in(move |s, new_data| {
            l4.lock()
                .unwrap()
                .push(("relogged_in", s.uid, new_data.connect_uid.clone()));
        })
}

fn service(log: &Log) -> SessionService<u64, ConnData> {
    SessionService::new(SessionConfig::default(), logging_hooks(log))
}

// =========================================================================
// Basic lifecycle
// =========================================================================

#[tokio::test]
async fn test_login_resolves_with_session() {
    let log = new_log();
    let sessions = service(&log);

    let session = sessions.login(1, data("hi")).await.unwrap();

    assert_eq!(session.uid, 1);
    assert_eq!(session.data.connect_uid, "hi");
    assert_eq!(entries(&log), vec![("logged_in", 1, "hi".to_string())]);
}

#[tokio::test]
async fn test_logout_resolves_with_same_session() {
    let log = new_log();
    let sessions = service(&log);
    let session = sessions.login(1, data("hi")).await.unwrap();

    let removed = sessions.logout(&1).await.unwrap();

    assert_eq!(removed, session);
    assert_eq!(sessions.state(&1).await, None);
    assert_eq!(
        entries(&log).last().cloned(),
        Some(("logged_out", 1, "RegularLogout".to_string()))
    );
}

#[tokio::test]
async fn test_unexpected_logout_keeps_session_inactive() {
    let log = new_log();
    let sessions = service(&log);
    let session = sessions.login(1, data("hi")).await.unwrap();

    let moved = sessions.unexpected_logout(&1, "ConnectionLost").await.unwrap();

    assert_eq!(moved, session);
    assert_eq!(sessions.get_inactive(&1).await, Some(session));
    assert_eq!(sessions.get(&1).await, None);
    assert_eq!(sessions.state(&1).await, Some(SessionState::Inactive));
    assert_eq!(
        entries(&log).last().cloned(),
        Some(("unexpected", 1, "ConnectionLost".to_string()))
    );
}

#[tokio::test]
async fn test_relogin_reactivates_and_allows_logout() {
    let log = new_log();
    let sessions = service(&log);
    sessions.login(1, data("hi")).await.unwrap();
    sessions.unexpected_logout(&1, "ConnectionLost").await.unwrap();

    let session = sessions.relogin(&1, data("back")).await.unwrap();

    assert_eq!(session.data, data("back"));
    assert_eq!(sessions.state(&1).await, Some(SessionState::Active));
    assert_eq!(
        entries(&log).last().cloned(),
        Some(("relogged_in", 1, "back".to_string()))
    );
    assert!(sessions.logout(&1).await.is_ok());
}

#[tokio::test]
async fn test_logout_never_logged_in_fails_not_found() {
    let log = new_log();
    let sessions = service(&log);

    let err = sessions.logout(&1).await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::NotFound { state: SessionState::Active, .. }
    ));
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn test_relogin_without_inactive_fails_not_found() {
    let log = new_log();
    let sessions = service(&log);
    sessions.login(1, data("hi")).await.unwrap();

    let err = sessions.relogin(&1, data("again")).await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::NotFound { state: SessionState::Inactive, .. }
    ));
}

#[tokio::test]
async fn test_logout_reasons_expose_stable_tags() {
    let log = new_log();
    let sessions = service(&log);

    let tags: Vec<String> = sessions
        .logout_reasons()
        .iter()
        .map(|r| serde_json::to_value(r).unwrap().as_str().unwrap().to_string())
        .collect();

    assert!(tags.contains(&"RegularLogout".to_string()));
    assert!(tags.contains(&"DuplicateLogin".to_string()));
}

// =========================================================================
// Duplicate-login arbitration
// =========================================================================

#[tokio::test]
async fn test_duplicate_login_deny_fails_with_reason_tag() {
    let log = new_log();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let hooks = logging_hooks(&log).on_duplicate_login(move |existing, candidate| {
        sink.lock()
            .unwrap()
            .push((existing.uid, candidate.uid, existing.token != candidate.token));
        DuplicateDecision::DenyNew
    });
    let sessions = SessionService::new(SessionConfig::default(), hooks);
    let first = sessions.login(1, data("hi")).await.unwrap();

    let err = sessions.login(1, data("hi")).await.unwrap_err();

    assert_eq!(err.to_string(), LogoutReason::DuplicateLogin.as_str());
    assert_eq!(err.logout_reason(), Some(LogoutReason::DuplicateLogin));
    assert_eq!(*seen.lock().unwrap(), vec![(1, 1, true)]);
    assert_eq!(sessions.get(&1).await, Some(first));
    assert!(
        !entries(&log).iter().any(|(hook, _, _)| *hook == "logged_out"),
        "denied login must not log the existing session out"
    );
}

#[tokio::test]
async fn test_duplicate_login_keep_new_replaces_session() {
    let log = new_log();
    let hooks = logging_hooks(&log)
        .on_duplicate_login(|_existing, _candidate| DuplicateDecision::KeepNew);
    let sessions = SessionService::new(SessionConfig::default(), hooks);
    let first = sessions.login(1, data("tab-1")).await.unwrap();

    let second = sessions.login(1, data("tab-2")).await.unwrap();

    assert_ne!(first.token, second.token);
    assert_eq!(sessions.get(&1).await, Some(second));
    assert_eq!(sessions.active_count().await, 1);
    assert_eq!(
        entries(&log),
        vec![
            ("logged_in", 1, "tab-1".to_string()),
            ("logged_out", 1, "DuplicateLogin".to_string()),
            ("logged_in", 1, "tab-2".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_concurrent_logins_same_uid_leave_one_active() {
    let log = new_log();
    let sessions = service(&log);

    let attempts = (0..16).map(|i| {
        let sessions = sessions.clone();
        async move { sessions.login(7, data(&format!("conn-{i}"))).await }
    });
    let results = join_all(attempts).await;

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1, "exactly one login wins under deny-new");
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, SessionError::DuplicateLogin { .. })));
    assert_eq!(sessions.get(&7).await.as_ref(), Some(winners[0]));
    assert_eq!(sessions.active_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_distinct_uids_all_succeed() {
    let log = new_log();
    let sessions = service(&log);

    let handles: Vec<_> = (0..32u64)
        .map(|uid| {
            let sessions = sessions.clone();
            tokio::spawn(async move { sessions.login(uid, data("x")).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(sessions.active_count().await, 32);
    assert_eq!(entries(&log).len(), 32);
}

// =========================================================================
// Inactive-login policy
// =========================================================================

#[tokio::test]
async fn test_login_inactive_uid_rejected_by_default() {
    let log = new_log();
    let sessions = service(&log);
    sessions.login(1, data("hi")).await.unwrap();
    sessions.unexpected_logout(&1, "ConnectionLost").await.unwrap();

    let err = sessions.login(1, data("again")).await.unwrap_err();

    assert!(matches!(err, SessionError::InactiveSession { .. }));
    assert_eq!(sessions.inactive_count().await, 1);
}

#[tokio::test]
async fn test_login_inactive_uid_replace_policy_from_json_config() {
    let config: SessionConfig =
        serde_json::from_str(r#"{ "inactive_login": "Replace" }"#).unwrap();
    let log = new_log();
    let sessions = SessionService::new(config, logging_hooks(&log));
    sessions.login(1, data("hi")).await.unwrap();
    sessions.unexpected_logout(&1, "ConnectionLost").await.unwrap();

    let fresh = sessions.login(1, data("again")).await.unwrap();

    assert_eq!(sessions.get(&1).await, Some(fresh));
    assert_eq!(sessions.inactive_count().await, 0);
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test]
async fn test_shutdown_logs_everyone_out_and_closes() {
    let log = new_log();
    let sessions = service(&log);
    sessions.login(1, data("a")).await.unwrap();
    sessions.login(2, data("b")).await.unwrap();
    sessions.unexpected_logout(&2, "ConnectionLost").await.unwrap();

    let removed = sessions.shutdown().await;

    assert_eq!(removed.len(), 2);
    assert!(sessions.is_closed().await);
    assert_eq!(sessions.active_count().await, 0);
    assert_eq!(sessions.inactive_count().await, 0);
    let shutdowns = entries(&log)
        .into_iter()
        .filter(|(hook, _, reason)| *hook == "logged_out" && reason == "Shutdown")
        .count();
    assert_eq!(shutdowns, 2);
}

#[tokio::test]
async fn test_operations_after_shutdown_fail_closed() {
    let log = new_log();
    let sessions = service(&log);
    sessions.shutdown().await;

    assert_eq!(sessions.login(1, data("a")).await, Err(SessionError::Closed));
    assert_eq!(sessions.logout(&1).await, Err(SessionError::Closed));
    assert_eq!(
        sessions.unexpected_logout(&1, "ConnectionLost").await,
        Err(SessionError::Closed)
    );
    assert_eq!(sessions.relogin(&1, data("a")).await, Err(SessionError::Closed));
    assert!(sessions.shutdown().await.is_empty(), "second shutdown is a no-op");
}

// =========================================================================
// Reaper
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_reaper_expires_inactive_after_grace() {
    let log = new_log();
    let config = SessionConfig {
        inactive_grace: Some(Duration::from_secs(30)),
        ..SessionConfig::default()
    };
    let sessions = SessionService::new(config, logging_hooks(&log));
    sessions.login(1, data("hi")).await.unwrap();
    sessions.unexpected_logout(&1, "ConnectionLost").await.unwrap();

    let reaper = sessions.spawn_reaper(Duration::from_secs(5));

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(sessions.state(&1).await, Some(SessionState::Inactive));

    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(sessions.state(&1).await, None);
    assert_eq!(
        entries(&log).last().cloned(),
        Some(("logged_out", 1, "InactiveExpired".to_string()))
    );

    sessions.shutdown().await;
    let stopped = tokio::time::timeout(Duration::from_secs(10), reaper).await;
    assert!(stopped.is_ok(), "reaper stops after shutdown");
}

#[tokio::test(start_paused = true)]
async fn test_expire_inactive_leaves_relogged_sessions_alone() {
    let log = new_log();
    let config = SessionConfig {
        inactive_grace: Some(Duration::from_secs(10)),
        ..SessionConfig::default()
    };
    let sessions = SessionService::new(config, logging_hooks(&log));
    sessions.login(1, data("hi")).await.unwrap();
    sessions.unexpected_logout(&1, "ConnectionLost").await.unwrap();
    sessions.relogin(&1, data("back")).await.unwrap();

    tokio::time::advance(Duration::from_secs(60)).await;
    let expired = sessions.expire_inactive().await;

    assert!(expired.is_empty());
    assert_eq!(sessions.state(&1).await, Some(SessionState::Active));
}

#[tokio::test(start_paused = true)]
async fn test_reaper_zero_period_runs_instead_of_panicking() {
    let log = new_log();
    let config = SessionConfig {
        inactive_grace: Some(Duration::ZERO),
        ..SessionConfig::default()
    };
    let sessions = SessionService::new(config, logging_hooks(&log));
    sessions.login(1, data("hi")).await.unwrap();
    sessions.unexpected_logout(&1, "ConnectionLost").await.unwrap();

    let reaper = sessions.spawn_reaper(Duration::ZERO);
    tokio::time::sleep(Duration::from_millis(5)).await;

    assert!(!reaper.is_finished(), "reaper should still be running");
    assert_eq!(sessions.state(&1).await, None);

    sessions.shutdown().await;
    let stopped = tokio::time::timeout(Duration::from_secs(1), reaper).await;
    assert!(
        matches!(stopped, Ok(Ok(()))),
        "reaper should exit cleanly, got {stopped:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_reaper_stops_when_every_handle_is_dropped() {
    let log = new_log();
    let sessions = service(&log);
    sessions.login(1, data("hi")).await.unwrap();

    let reaper = sessions.spawn_reaper(Duration::from_millis(10));
    drop(sessions);

    let stopped = tokio::time::timeout(Duration::from_millis(200), reaper).await;
    assert!(
        matches!(stopped, Ok(Ok(()))),
        "reaper should exit once the service is gone, got {stopped:?}"
    );
    // Dropping the registry never reports a logout: only shutdown does.
    assert!(!entries(&log).iter().any(|(hook, _, _)| *hook == "logged_out"));
}
