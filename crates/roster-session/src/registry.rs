//! The session registry: tracks active and inactive sessions per uid.
//!
//! This is the central piece of the session layer. It's responsible for:
//! - Logging users in, and arbitrating when a uid logs in twice
//! - Moving users to the inactive map when their connection drops
//! - Reactivating inactive users on relogin
//! - Expiring inactive users who never came back
//!
//! # Concurrency note
//!
//! `SessionRegistry` is NOT thread-safe by itself: it uses plain
//! `HashMap`s and `&mut self` operations. It is meant to be owned by one
//! task, or wrapped in a lock at a higher level (`roster::SessionService`
//! does exactly that). Hooks run while the caller holds `&mut self`, so
//! they can never observe a half-finished transition.

use std::collections::HashMap;

use tokio::time::Instant;

use crate::{
    DuplicateDecision, EventHooks, InactiveLoginPolicy, LogoutReason, Session, SessionConfig,
    SessionError, SessionState, Uid,
};

/// An inactive session plus the moment it went inactive.
///
/// The session itself is stored unchanged, so a later `relogin` gets back
/// the very same instance (same token) it lost.
#[derive(Debug)]
struct InactiveEntry<U, D> {
    /// The session exactly as it was when the connection dropped.
    session: Session<U, D>,

    /// When `unexpected_logout` moved it here. `expire_inactive` compares
    /// this against `SessionConfig::inactive_grace`.
    ///
    /// This is tokio's `Instant`, not std's, so tests can drive it with a
    /// paused clock.
    since: Instant,
}

/// Owns every session of the process and enforces "one session per uid".
///
/// ## Lifecycle
///
/// ```text
/// login() ──→ [Active] ──unexpected_logout()──→ [Inactive]
///                │  ↑                               │
///                │  └──────────relogin()────────────┤
///                │                                  │
///    logout() / duplicate                  expire_inactive()
///                │                                  │
///                ▼                                  ▼
///             (gone)                             (gone)
/// ```
///
/// A uid is in at most one of the two maps at any time.
pub struct SessionRegistry<U, D> {
    /// Logged-in sessions, keyed by uid.
    active: HashMap<U, Session<U, D>>,

    /// Sessions that dropped unexpectedly and may relogin.
    inactive: HashMap<U, InactiveEntry<U, D>>,

    /// Policies for duplicate and inactive logins, and the grace period.
    config: SessionConfig,

    /// Callbacks fired after each transition, with the maps already updated.
    hooks: EventHooks<U, D>,
}

impl<U: Uid, D: Clone> SessionRegistry<U, D> {
    /// Creates an empty registry with the given config and hooks.
    pub fn new(config: SessionConfig, hooks: EventHooks<U, D>) -> Self {
        Self {
            active: HashMap::new(),
            inactive: HashMap::new(),
            config,
            hooks,
        }
    }

    /// Returns the stable logout reason tags.
    pub fn logout_reasons(&self) -> &'static [LogoutReason] {
        &LogoutReason::ALL
    }

    /// Logs a uid in.
    ///
    /// If the uid already has an active session, the duplicate-login hook
    /// decides whether the new session replaces it. Without a hook,
    /// `config.duplicate_login_default` decides.
    ///
    /// # Errors
    /// - [`SessionError::DuplicateLogin`] if arbitration denied the login
    /// - [`SessionError::InactiveSession`] if the uid is inactive and the
    ///   config says [`InactiveLoginPolicy::Reject`]
    pub fn login(&mut self, uid: U, data: D) -> Result<Session<U, D>, SessionError> {
        if self.inactive.contains_key(&uid) {
            match self.config.inactive_login {
                InactiveLoginPolicy::Reject => {
                    tracing::warn!(%uid, "login rejected: uid holds an inactive session");
                    return Err(SessionError::InactiveSession {
                        uid: uid.to_string(),
                    });
                }
                InactiveLoginPolicy::Replace => {
                    if let Some(stale) = self.inactive.remove(&uid) {
                        tracing::info!(%uid, "inactive session replaced by fresh login");
                        self.hooks.fire_logged_out(&stale.session, LogoutReason::DuplicateLogin);
                    }
                }
            }
        }

        let candidate = Session::new(uid, data);
        if !self.active.contains_key(&candidate.uid) {
            return Ok(self.install(candidate));
        }

        // The candidate is not installed until the decision is in.
        let decision = self
            .active
            .get(&candidate.uid)
            .and_then(|existing| self.hooks.arbitrate(existing, &candidate))
            .unwrap_or(self.config.duplicate_login_default);

        tracing::debug!(uid = %candidate.uid, ?decision, "duplicate login arbitrated");

        match decision {
            DuplicateDecision::DenyNew => {
                tracing::warn!(uid = %candidate.uid, "duplicate login denied");
                Err(SessionError::DuplicateLogin {
                    uid: candidate.uid.to_string(),
                })
            }
            DuplicateDecision::KeepNew => {
                // Swap the candidate in before any hook runs, so the maps are
                // already final if a hook panics.
                let evicted = self.active.insert(candidate.uid.clone(), candidate.clone());
                if let Some(evicted) = evicted {
                    tracing::info!(uid = %evicted.uid, "session evicted by duplicate login");
                    self.hooks.fire_logged_out(&evicted, LogoutReason::DuplicateLogin);
                }
                tracing::info!(uid = %candidate.uid, "session logged in");
                self.hooks.fire_logged_in(&candidate);
                Ok(candidate)
            }
        }
    }

    /// Logs an active uid out for good.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if the uid has no active session.
    pub fn logout(&mut self, uid: &U) -> Result<Session<U, D>, SessionError> {
        let session = self
            .active
            .remove(uid)
            .ok_or_else(|| not_found(uid, SessionState::Active))?;

        tracing::info!(%uid, "session logged out");
        self.hooks.fire_logged_out(&session, LogoutReason::RegularLogout);
        Ok(session)
    }

    /// Moves an active session to the inactive map.
    ///
    /// The session keeps its data and token; it can be brought back with
    /// [`relogin`](Self::relogin).
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if the uid has no active session.
    pub fn unexpected_logout(
        &mut self,
        uid: &U,
        reason: impl Into<String>,
    ) -> Result<Session<U, D>, SessionError> {
        let session = self
            .active
            .remove(uid)
            .ok_or_else(|| not_found(uid, SessionState::Active))?;
        let reason = reason.into();

        tracing::info!(%uid, %reason, "session went inactive");
        self.inactive.insert(
            uid.clone(),
            InactiveEntry {
                session: session.clone(),
                since: Instant::now(),
            },
        );
        self.hooks.fire_unexpected_logged_out(&session, &reason);
        Ok(session)
    }

    /// Reactivates an inactive session, replacing its data.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if the uid has no inactive session.
    pub fn relogin(&mut self, uid: &U, new_data: D) -> Result<Session<U, D>, SessionError> {
        let InactiveEntry { mut session, .. } = self
            .inactive
            .remove(uid)
            .ok_or_else(|| not_found(uid, SessionState::Inactive))?;

        session.data = new_data;
        self.active.insert(uid.clone(), session.clone());

        tracing::info!(%uid, "session relogged in");
        self.hooks.fire_relogged_in(&session, &session.data);
        Ok(session)
    }

    /// Removes inactive sessions older than `config.inactive_grace`.
    ///
    /// Each removed session is reported to `on_logged_out` with
    /// [`LogoutReason::InactiveExpired`]. Does nothing when no grace period
    /// is configured.
    pub fn expire_inactive(&mut self) -> Vec<Session<U, D>> {
        let Some(grace) = self.config.inactive_grace else {
            return Vec::new();
        };

        let stale: Vec<U> = self
            .inactive
            .iter()
            .filter(|(_, entry)| entry.since.elapsed() >= grace)
            .map(|(uid, _)| uid.clone())
            .collect();

        let mut expired = Vec::with_capacity(stale.len());
        for uid in stale {
            if let Some(entry) = self.inactive.remove(&uid) {
                tracing::info!(%uid, "inactive session expired");
                self.hooks.fire_logged_out(&entry.session, LogoutReason::InactiveExpired);
                expired.push(entry.session);
            }
        }
        expired
    }

    /// Removes every session, active and inactive.
    ///
    /// Each one is reported to `on_logged_out` with
    /// [`LogoutReason::Shutdown`].
    pub fn logout_all(&mut self) -> Vec<Session<U, D>> {
        let mut removed: Vec<Session<U, D>> = self.active.drain().map(|(_, s)| s).collect();
        removed.extend(self.inactive.drain().map(|(_, entry)| entry.session));

        for session in &removed {
            self.hooks.fire_logged_out(session, LogoutReason::Shutdown);
        }
        tracing::info!(count = removed.len(), "all sessions logged out");
        removed
    }

    /// Looks up an active session.
    pub fn get(&self, uid: &U) -> Option<&Session<U, D>> {
        self.active.get(uid)
    }

    /// Looks up an inactive session.
    pub fn get_inactive(&self, uid: &U) -> Option<&Session<U, D>> {
        self.inactive.get(uid).map(|entry| &entry.session)
    }

    /// Returns which map holds the uid, or `None` if it is unknown.
    pub fn state(&self, uid: &U) -> Option<SessionState> {
        if self.active.contains_key(uid) {
            Some(SessionState::Active)
        } else if self.inactive.contains_key(uid) {
            Some(SessionState::Inactive)
        } else {
            None
        }
    }

    /// Number of active sessions.
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Number of inactive sessions.
    pub fn inactive_len(&self) -> usize {
        self.inactive.len()
    }

    /// Total number of sessions, active and inactive.
    pub fn len(&self) -> usize {
        self.active.len() + self.inactive.len()
    }

    /// Returns `true` if the registry holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.inactive.is_empty()
    }

    /// The configuration this registry was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Inserts a session into the active map and fires `on_logged_in`.
    fn install(&mut self, session: Session<U, D>) -> Session<U, D> {
        self.active.insert(session.uid.clone(), session.clone());
        tracing::info!(uid = %session.uid, "session logged in");
        self.hooks.fire_logged_in(&session);
        session
    }
}

fn not_found<U: Uid>(uid: &U, state: SessionState) -> SessionError {
    SessionError::NotFound {
        uid: uid.to_string(),
        state,
    }
}

// =========================================================================
// Tests
// =========================================================================
