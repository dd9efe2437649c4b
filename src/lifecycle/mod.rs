//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger (first and second request)
//!
//! Shutdown (shutdown.rs):
//!     first request → accept loop stops → sessions finish (or are aborted)
//!     → binary waits for the drain deadline or a second request → exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::{drain_sessions, Drain, Shutdown};
