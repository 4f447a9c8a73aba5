//! `SessionService`: the owned, shareable front door to a registry.
//!
//! `SessionRegistry` is a plain single-owner state machine. A server needs
//! to call it from many connection tasks at once, so this module wraps it in
//! an `Arc<Mutex<..>>` and exposes every lifecycle operation as an
//! `async fn`.
//!
//! The lock is held across the map mutation AND the hook dispatch. Hooks are
//! synchronous closures, so they cannot await the lock again and cannot
//! interleave with another operation.

use std::sync::Arc;
use std::time::Duration;

use roster_session::{
    EventHooks, LogoutReason, Session, SessionConfig, SessionError, SessionRegistry,
    SessionState, Uid,
};
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;

/// Registry plus the shutdown flag, guarded together.
///
/// Both live behind the same lock so a lifecycle call can never slip in
/// between "check closed" and "mutate the maps".
struct Inner<U, D> {
    /// The state machine doing the real work.
    registry: SessionRegistry<U, D>,

    /// Set once by [`SessionService::shutdown`]. After that every lifecycle
    /// call fails with [`SessionError::Closed`].
    closed: bool,
}

/// Shortest period the reaper accepts. `tokio::time::interval` panics on a
/// zero period, so smaller values are raised to this.
const MIN_REAPER_PERIOD: Duration = Duration::from_millis(1);

/// Cloneable async handle to one session registry.
///
/// Every clone talks to the same registry. Construction and teardown are
/// explicit: build it with [`new`](Self::new), end it with
/// [`shutdown`](Self::shutdown).
///
/// # Example
///
/// ```rust,no_run
/// use roster::prelude::*;
///
/// # async fn demo() -> Result<(), SessionError> {
/// let hooks = EventHooks::new()
///     .on_duplicate_login(|_existing, _candidate| DuplicateDecision::KeepNew);
/// let sessions: SessionService<u64, String> =
///     SessionService::new(SessionConfig::default(), hooks);
///
/// let session = sessions.login(1, "conn-a".to_string()).await?;
/// sessions.unexpected_logout(&session.uid, "ConnectionLost").await?;
/// sessions.relogin(&1, "conn-b".to_string()).await?;
/// sessions.logout(&1).await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionService<U, D> {
    inner: Arc<Mutex<Inner<U, D>>>,
}

impl<U, D> Clone for SessionService<U, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<U, D> SessionService<U, D>
where
    U: Uid,
    D: Clone + Send + 'static,
{
    /// Creates a service around a fresh, empty registry.
    pub fn new(config: SessionConfig, hooks: EventHooks<U, D>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                registry: SessionRegistry::new(config, hooks),
                closed: false,
            })),
        }
    }

    /// Returns the stable logout reason tags.
    pub fn logout_reasons(&self) -> &'static [LogoutReason] {
        &LogoutReason::ALL
    }

    /// Logs a uid in. See [`SessionRegistry::login`].
    pub async fn login(&self, uid: U, data: D) -> Result<Session<U, D>, SessionError> {
        self.open().await?.registry.login(uid, data)
    }

    /// Logs an active uid out. See [`SessionRegistry::logout`].
    pub async fn logout(&self, uid: &U) -> Result<Session<U, D>, SessionError> {
        self.open().await?.registry.logout(uid)
    }

    /// Moves an active uid to the inactive map.
    /// See [`SessionRegistry::unexpected_logout`].
    pub async fn unexpected_logout(
        &self,
        uid: &U,
        reason: impl Into<String>,
    ) -> Result<Session<U, D>, SessionError> {
        self.open().await?.registry.unexpected_logout(uid, reason)
    }

    /// Reactivates an inactive uid. See [`SessionRegistry::relogin`].
    pub async fn relogin(&self, uid: &U, new_data: D) -> Result<Session<U, D>, SessionError> {
        self.open().await?.registry.relogin(uid, new_data)
    }

    /// Expires stale inactive sessions now.
    /// Returns nothing once the service is shut down.
    pub async fn expire_inactive(&self) -> Vec<Session<U, D>> {
        match self.open().await {
            Ok(mut inner) => inner.registry.expire_inactive(),
            Err(_) => Vec::new(),
        }
    }

    /// Returns a copy of the active session for `uid`.
    pub async fn get(&self, uid: &U) -> Option<Session<U, D>> {
        self.inner.lock().await.registry.get(uid).cloned()
    }

    /// Returns a copy of the inactive session for `uid`.
    pub async fn get_inactive(&self, uid: &U) -> Option<Session<U, D>> {
        self.inner.lock().await.registry.get_inactive(uid).cloned()
    }

    /// Returns which map holds the uid, if any.
    pub async fn state(&self, uid: &U) -> Option<SessionState> {
        self.inner.lock().await.registry.state(uid)
    }

    /// Number of active sessions.
    pub async fn active_count(&self) -> usize {
        self.inner.lock().await.registry.active_len()
    }

    /// Number of inactive sessions.
    pub async fn inactive_count(&self) -> usize {
        self.inner.lock().await.registry.inactive_len()
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has run.
    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed
    }

    /// Closes the service and logs every session out with
    /// [`LogoutReason::Shutdown`].
    ///
    /// Later lifecycle calls fail with [`SessionError::Closed`]. Calling
    /// this twice is harmless; the second call returns an empty list.
    pub async fn shutdown(&self) -> Vec<Session<U, D>> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Vec::new();
        }
        inner.closed = true;
        let removed = inner.registry.logout_all();
        tracing::info!(sessions = removed.len(), "session service shut down");
        removed
    }

    /// Spawns a task that calls [`expire_inactive`](Self::expire_inactive)
    /// every `period`.
    ///
    /// The task exits on its own after [`shutdown`](Self::shutdown), or once
    /// every `SessionService` handle has been dropped. It only does useful
    /// work when `SessionConfig::inactive_grace` is set.
    ///
    /// A zero `period` is raised to one millisecond.
    pub fn spawn_reaper(&self, period: Duration) -> JoinHandle<()> {
        // The task holds only a weak reference, so it never keeps the
        // registry (and the hook closures inside it) alive on its own.
        let weak = Arc::downgrade(&self.inner);
        let period = period.max(MIN_REAPER_PERIOD);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                let mut inner = shared.lock().await;
                if inner.closed {
                    break;
                }
                let expired = inner.registry.expire_inactive();
                if !expired.is_empty() {
                    tracing::debug!(count = expired.len(), "reaper expired inactive sessions");
                }
            }
            tracing::debug!("session reaper stopped");
        })
    }

    /// Locks the registry, failing if the service has been shut down.
    async fn open(&self) -> Result<MutexGuard<'_, Inner<U, D>>, SessionError> {
        let inner = self.inner.lock().await;
        if inner.closed {
            return Err(SessionError::Closed);
        }
        Ok(inner)
    }
}
