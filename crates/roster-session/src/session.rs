//! Session types: the data structures that represent one logged-in user.
//!
//! A "session" is the registry's record of an authenticated occupancy of a
//! uid. It tracks:
//! - WHO holds it (`uid`)
//! - WHAT the caller attached to it (`data`, e.g. a connection correlation id)
//! - WHICH instance it is (`token`), so two sessions for the same uid can be
//!   told apart during duplicate-login arbitration
//!
//! Whether a session is active or inactive is not stored on the session
//! itself. It follows from which of the registry's two maps holds it.

use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Uid
// ---------------------------------------------------------------------------

/// Anything usable as a session key.
///
/// The registry never looks inside a uid: it hashes it, compares it, and
/// prints it in logs and errors. `u64`, `String`, and most newtype ids
/// qualify automatically through the blanket impl.
pub trait Uid: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static {}

impl<T> Uid for T where T: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static {}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Which map currently holds a session.
///
/// ```text
///   Active ──(unexpected_logout)──→ Inactive
///     ↑                                │
///     └────────────(relogin)───────────┘
/// ```
///
/// `logout` removes an active session entirely; an inactive session leaves
/// the registry only through expiry or `logout_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// The user is logged in.
    Active,

    /// The user disconnected unexpectedly and may relogin.
    Inactive,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

// ---------------------------------------------------------------------------
// LogoutReason
// ---------------------------------------------------------------------------

/// Why a session left the registry.
///
/// Delivered to the `on_logged_out` hook. The string forms are stable:
/// they are what `Display`, [`as_str`](Self::as_str), and serde all produce,
/// so hosts can forward them to clients verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogoutReason {
    /// The user logged out on purpose.
    RegularLogout,

    /// A newer login for the same uid won arbitration and evicted this one.
    DuplicateLogin,

    /// The session sat inactive longer than `SessionConfig::inactive_grace`.
    InactiveExpired,

    /// The owning service shut down.
    Shutdown,
}

impl LogoutReason {
    /// Every reason tag, in declaration order.
    pub const ALL: [LogoutReason; 4] = [
        Self::RegularLogout,
        Self::DuplicateLogin,
        Self::InactiveExpired,
        Self::Shutdown,
    ];

    /// Returns the stable tag for this reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RegularLogout => "RegularLogout",
            Self::DuplicateLogin => "DuplicateLogin",
            Self::InactiveExpired => "InactiveExpired",
            Self::Shutdown => "Shutdown",
        }
    }
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DuplicateDecision
// ---------------------------------------------------------------------------

/// The outcome of duplicate-login arbitration.
///
/// Returned by the `on_duplicate_login` hook (or taken from
/// `SessionConfig::duplicate_login_default` when no hook is registered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicateDecision {
    /// Evict the existing session and install the new one.
    KeepNew,

    /// Reject the new login; the existing session stays as it is.
    DenyNew,
}

// ---------------------------------------------------------------------------
// InactiveLoginPolicy
// ---------------------------------------------------------------------------

/// What `login` does for a uid that only holds an inactive session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InactiveLoginPolicy {
    /// Fail with `SessionError::InactiveSession`; the caller should use
    /// `relogin` instead.
    Reject,

    /// Drop the inactive session (reported as `DuplicateLogin`) and log the
    /// uid in fresh.
    Replace,
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for registry behavior.
///
/// Every field has a default, and missing fields fall back to it when the
/// config is deserialized, so a host can load `{}` and override only what it
/// cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Decision applied to a duplicate login when no `on_duplicate_login`
    /// hook is registered.
    ///
    /// Default: `DenyNew`.
    pub duplicate_login_default: DuplicateDecision,

    /// How `login` treats a uid that holds only an inactive session.
    ///
    /// Default: `Reject`.
    pub inactive_login: InactiveLoginPolicy,

    /// How long an inactive session waits for `relogin` before
    /// `expire_inactive` removes it. `None` keeps it indefinitely.
    ///
    /// Default: `None`.
    pub inactive_grace: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duplicate_login_default: DuplicateDecision::DenyNew,
            inactive_login: InactiveLoginPolicy::Reject,
            inactive_grace: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One authenticated occupancy of a uid.
///
/// Created by `login`. The same instance moves between the active and
/// inactive maps on `unexpected_logout`/`relogin`, so its `token` is
/// preserved across a disconnect.
#[derive(Debug, Clone, PartialEq)]
pub struct Session<U, D> {
    /// Which user this session belongs to.
    pub uid: U,

    /// Caller-supplied payload. Replaced by `relogin`.
    pub data: D,

    /// Random per-instance token (32 hex chars, 128 bits).
    pub token: String,
}

impl<U, D> Session<U, D> {
    /// Creates a session with a freshly generated token.
    pub fn new(uid: U, data: D) -> Self {
        Self {
            uid,
            data,
            token: generate_token(),
        }
    }
}

/// Generates a random 32-character lowercase hex string.
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
