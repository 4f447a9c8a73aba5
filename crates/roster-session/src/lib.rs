//! Session lifecycle management for Roster.
//!
//! This crate tracks which users are logged in and what happens when they
//! drop, come back, or log in twice:
//!
//! 1. **Registry**: one session per uid, split into an active and an
//!    inactive map ([`SessionRegistry`])
//! 2. **Hooks**: synchronous callbacks fired at every transition
//!    ([`EventHooks`])
//! 3. **Arbitration**: a duplicate login is settled by a hook returning a
//!    [`DuplicateDecision`]
//!
//! # How it fits in the stack
//!
//! ```text
//! Host server (above)  ← owns connections, authenticates, calls login/logout
//!     ↕
//! roster::SessionService  ← async handle, serializes access with a lock
//!     ↕
//! Session Layer (this crate)  ← state machine + hooks, no I/O
//! ```

mod error;
mod hooks;
mod registry;
mod session;

pub use error::SessionError;
pub use hooks::{EventHooks, HookKind};
pub use registry::SessionRegistry;
pub use session::{
    DuplicateDecision, InactiveLoginPolicy, LogoutReason, Session, SessionConfig, SessionState,
    Uid,
};
