//! # Roster
//!
//! A per-process registry of logged-in users.
//!
//! Roster tracks which uids hold an active session, which hold an inactive
//! one after an unexpected disconnect, and settles duplicate logins for the
//! same uid through a hook. It stores opaque per-session data and never
//! touches the transport: the host server owns its connections and tells
//! Roster what happened.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roster::prelude::*;
//!
//! # async fn run() -> Result<(), SessionError> {
//! roster::init_tracing();
//!
//! let hooks = EventHooks::new()
//!     .on_logged_out(|session: &Session<u64, String>, reason| {
//!         tracing::info!(uid = session.uid, %reason, "kick connection");
//!     })
//!     .on_duplicate_login(|_existing, _candidate| DuplicateDecision::KeepNew);
//!
//! let sessions = SessionService::new(SessionConfig::default(), hooks);
//! sessions.login(7, "conn-1".to_string()).await?;
//! # Ok(())
//! # }
//! ```

mod service;
mod telemetry;

pub use roster_session::{
    DuplicateDecision, EventHooks, HookKind, InactiveLoginPolicy, LogoutReason, Session,
    SessionConfig, SessionError, SessionRegistry, SessionState, Uid,
};
pub use service::SessionService;
pub use telemetry::init_tracing;

/// Everything a host usually needs, in one import.
pub mod prelude {
    pub use crate::{
        DuplicateDecision, EventHooks, InactiveLoginPolicy, LogoutReason, Session,
        SessionConfig, SessionError, SessionService, SessionState,
    };
}
