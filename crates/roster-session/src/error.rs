//! Error types for the session layer.

use crate::{LogoutReason, SessionState};

/// Errors returned by registry lifecycle operations.
///
/// A failed operation leaves the registry exactly as it was before the call.
/// uids are rendered to strings so the error type stays non-generic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The uid has no session in the map the operation needed.
    /// `logout`/`unexpected_logout` look in the active map, `relogin` in
    /// the inactive one.
    #[error("no {state} session for uid {uid}")]
    NotFound { uid: String, state: SessionState },

    /// A login was denied by duplicate-login arbitration.
    /// The message is exactly the `DuplicateLogin` reason tag.
    #[error("DuplicateLogin")]
    DuplicateLogin { uid: String },

    /// A login targeted a uid that holds an inactive session, and the
    /// registry is configured to reject it. Use `relogin` instead.
    #[error("uid {uid} holds an inactive session")]
    InactiveSession { uid: String },

    /// The owning service has been shut down.
    #[error("session registry is closed")]
    Closed,
}

impl SessionError {
    /// Returns the logout reason carried by this error, if any.
    pub fn logout_reason(&self) -> Option<LogoutReason> {
        match self {
            Self::DuplicateLogin { .. } => Some(LogoutReason::DuplicateLogin),
            _ => None,
        }
    }
}
