use std::time::Duration;

use roster::prelude::*;

// ---------------------------------------------------------------------------
// Connection payload
// ---------------------------------------------------------------------------

/// What a chat server would attach to a session: which socket it lives on.
#[derive(Clone, Debug, PartialEq)]
struct Conn {
    connect_uid: String,
}

fn conn(id: &str) -> Conn {
    Conn {
        connect_uid: id.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

fn presence_hooks() -> EventHooks<u64, Conn> {
    EventHooks::new()
        .on_logged_in(|s: &Session<u64, Conn>| {
            tracing::info!(uid = s.uid, conn = %s.data.connect_uid, "online");
        })
        .on_logged_out(|s, reason| {
            // A real server would close `s.data.connect_uid` here.
            tracing::info!(uid = s.uid, conn = %s.data.connect_uid, %reason, "offline");
        })
        .on_unexpected_logged_out(|s, reason| {
            tracing::info!(uid = s.uid, %reason, "away");
        })
        .on_relogged_in(|s, new_data| {
            tracing::info!(uid = s.uid, conn = %new_data.connect_uid, "back online");
        })
        .on_duplicate_login(|existing, candidate| {
            // Same socket logging in twice is a client bug; a new socket
            // (another tab, another device) takes over.
            if existing.data == candidate.data {
                DuplicateDecision::DenyNew
            } else {
                DuplicateDecision::KeepNew
            }
        })
}

// ---------------------------------------------------------------------------
// Walkthrough
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), SessionError> {
    roster::init_tracing();

    let config = SessionConfig {
        inactive_grace: Some(Duration::from_secs(2)),
        ..SessionConfig::default()
    };
    let sessions = SessionService::new(config, presence_hooks());
    let reaper = sessions.spawn_reaper(Duration::from_millis(500));

    // Alice logs in, then logs in again from the same socket: denied.
    sessions.login(1, conn("ws-a1")).await?;
    if let Err(e) = sessions.login(1, conn("ws-a1")).await {
        tracing::warn!(error = %e, "second login from same socket rejected");
    }

    // Alice opens a second tab: the new socket wins.
    sessions.login(1, conn("ws-a2")).await?;

    // Bob's Wi-Fi drops, and he comes back on a new socket.
    sessions.login(2, conn("ws-b1")).await?;
    sessions.unexpected_logout(&2, "ConnectionLost").await?;
    sessions.relogin(&2, conn("ws-b2")).await?;

    // Carol drops and never returns; the reaper expires her.
    sessions.login(3, conn("ws-c1")).await?;
    sessions.unexpected_logout(&3, "ConnectionLost").await?;
    tokio::time::sleep(Duration::from_secs(3)).await;
    let carol = sessions.state(&3).await;
    tracing::info!(state = ?carol, "carol after grace period");

    sessions.logout(&1).await?;

    let remaining = sessions.shutdown().await;
    tracing::info!(count = remaining.len(), "shut down");
    if let Err(e) = reaper.await {
        tracing::error!(error = %e, "reaper task failed");
    }
    Ok(())
}
