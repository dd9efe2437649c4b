//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, non-blocking slot acquisition)
//!         → rejected: closed at once, counted
//!         → admitted: permit moves into the session task
//!     → server.rs (per-session MockConfig, penalty, span, spawn)
//!     → connection.rs (session id, active count)
//!     → session::handle_connection
//! ```
//!
//! # Design Decisions
//! - Bounded admission prevents resource exhaustion
//! - Each session tracked for logs, metrics and shutdown drain
//! - Slots are released by drop, so every exit path frees exactly one

pub mod connection;
pub mod listener;
pub mod server;

pub use connection::{ConnectionGuard, ConnectionTracker, SessionId};
pub use listener::{Admission, ConnectionPermit, Listener, ListenerError};
pub use server::MockServer;
