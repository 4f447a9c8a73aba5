//! Event hooks: callbacks the registry fires at each lifecycle transition.
//!
//! The registry doesn't know what a "connection" is or how to tell a client
//! it was kicked. That's the host's job. Instead it exposes a fixed set of
//! optional callback slots and invokes them synchronously, in-line with the
//! operation that triggered them.
//!
//! Four of the slots are pure observers. The fifth, `on_duplicate_login`,
//! is part of the control flow: its return value decides whether a second
//! login for the same uid evicts the first one or is rejected.
//!
//! # Example
//!
//! ```rust
//! use roster_session::{DuplicateDecision, EventHooks};
//!
//! let hooks: EventHooks<u64, String> = EventHooks::new()
//!     .on_logged_in(|session| println!("{} is online", session.uid))
//!     .on_duplicate_login(|existing, candidate| {
//!         if existing.data == candidate.data {
//!             DuplicateDecision::DenyNew
//!         } else {
//!             DuplicateDecision::KeepNew
//!         }
//!     });
//! ```

use std::fmt;

use crate::{DuplicateDecision, LogoutReason, Session};

type LoggedInFn<U, D> = Box<dyn Fn(&Session<U, D>) + Send + Sync>;
type LoggedOutFn<U, D> = Box<dyn Fn(&Session<U, D>, LogoutReason) + Send + Sync>;
type UnexpectedLoggedOutFn<U, D> = Box<dyn Fn(&Session<U, D>, &str) + Send + Sync>;
type ReloggedInFn<U, D> = Box<dyn Fn(&Session<U, D>, &D) + Send + Sync>;
type DuplicateLoginFn<U, D> =
    Box<dyn Fn(&Session<U, D>, &Session<U, D>) -> DuplicateDecision + Send + Sync>;

/// Names the hook slots, for [`EventHooks::is_registered`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    LoggedIn,
    LoggedOut,
    UnexpectedLoggedOut,
    ReloggedIn,
    DuplicateLogin,
}

/// The set of callbacks a registry invokes.
///
/// All slots are optional; an empty `EventHooks` is valid and simply makes
/// the registry silent. Closures must be `Send + Sync` because the registry
/// may live behind a lock shared across tokio tasks.
///
/// Hooks run while the registry is mid-operation. They receive borrowed
/// sessions and cannot call back into the registry.
pub struct EventHooks<U, D> {
    logged_in: Option<LoggedInFn<U, D>>,
    logged_out: Option<LoggedOutFn<U, D>>,
    unexpected_logged_out: Option<UnexpectedLoggedOutFn<U, D>>,
    relogged_in: Option<ReloggedInFn<U, D>>,
    duplicate_login: Option<DuplicateLoginFn<U, D>>,
}

impl<U, D> EventHooks<U, D> {
    /// Creates an empty hook set.
    pub fn new() -> Self {
        Self {
            logged_in: None,
            logged_out: None,
            unexpected_logged_out: None,
            relogged_in: None,
            duplicate_login: None,
        }
    }

    /// Called with the new session after a successful login.
    pub fn on_logged_in<F>(mut self, f: F) -> Self
    where
        F: Fn(&Session<U, D>) + Send + Sync + 'static,
    {
        self.logged_in = Some(Box::new(f));
        self
    }

    /// Called with the removed session and the reason it left.
    pub fn on_logged_out<F>(mut self, f: F) -> Self
    where
        F: Fn(&Session<U, D>, LogoutReason) + Send + Sync + 'static,
    {
        self.logged_out = Some(Box::new(f));
        self
    }

    /// Called with the session (now inactive) and the caller's reason text.
    pub fn on_unexpected_logged_out<F>(mut self, f: F) -> Self
    where
        F: Fn(&Session<U, D>, &str) + Send + Sync + 'static,
    {
        self.unexpected_logged_out = Some(Box::new(f));
        self
    }

    /// Called with the reactivated session and the data it was given.
    pub fn on_relogged_in<F>(mut self, f: F) -> Self
    where
        F: Fn(&Session<U, D>, &D) + Send + Sync + 'static,
    {
        self.relogged_in = Some(Box::new(f));
        self
    }

    /// Decides a duplicate login. Receives `(existing, candidate)`.
    pub fn on_duplicate_login<F>(mut self, f: F) -> Self
    where
        F: Fn(&Session<U, D>, &Session<U, D>) -> DuplicateDecision + Send + Sync + 'static,
    {
        self.duplicate_login = Some(Box::new(f));
        self
    }

    /// Returns `true` if the given slot has a callback.
    pub fn is_registered(&self, kind: HookKind) -> bool {
        match kind {
            HookKind::LoggedIn => self.logged_in.is_some(),
            HookKind::LoggedOut => self.logged_out.is_some(),
            HookKind::UnexpectedLoggedOut => self.unexpected_logged_out.is_some(),
            HookKind::ReloggedIn => self.relogged_in.is_some(),
            HookKind::DuplicateLogin => self.duplicate_login.is_some(),
        }
    }

    // -- Dispatch (used by the registry) ----------------------------------

    pub(crate) fn fire_logged_in(&self, session: &Session<U, D>) {
        if let Some(f) = &self.logged_in {
            f(session);
        }
    }

    pub(crate) fn fire_logged_out(&self, session: &Session<U, D>, reason: LogoutReason) {
        if let Some(f) = &self.logged_out {
            f(session, reason);
        }
    }

    pub(crate) fn fire_unexpected_logged_out(&self, session: &Session<U, D>, reason: &str) {
        if let Some(f) = &self.unexpected_logged_out {
            f(session, reason);
        }
    }

    pub(crate) fn fire_relogged_in(&self, session: &Session<U, D>, new_data: &D) {
        if let Some(f) = &self.relogged_in {
            f(session, new_data);
        }
    }

    /// Returns `None` when no arbitration hook is registered, so the caller
    /// can fall back to its configured default.
    pub(crate) fn arbitrate(
        &self,
        existing: &Session<U, D>,
        candidate: &Session<U, D>,
    ) -> Option<DuplicateDecision> {
        self.duplicate_login.as_ref().map(|f| f(existing, candidate))
    }
}

impl<U, D> Default for EventHooks<U, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U, D> fmt::Debug for EventHooks<U, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHooks")
            .field("logged_in", &self.logged_in.is_some())
            .field("logged_out", &self.logged_out.is_some())
            .field("unexpected_logged_out", &self.unexpected_logged_out.is_some())
            .field("relogged_in", &self.relogged_in.is_some())
            .field("duplicate_login", &self.duplicate_login.is_some())
            .finish()
    }
}
