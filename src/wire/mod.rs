//! Wire subsystem.
//!
//! # Data Flow
//! ```text
//! accepted stream
//!     → peer.rs (deadline-bounded reads/writes, TransportError)
//!     → protocol handler
//!         → frame.rs (named binary layouts for MySQL/TDS/RDP)
//!         → sanitize.rs (before echoing any attacker text)
//! ```
//!
//! # Design Decisions
//! - Attacker input is only substring-matched, never parsed into structure
//! - Every read and write has a deadline

pub mod frame;
pub mod peer;
pub mod sanitize;

pub use frame::{Frame, FrameBuilder};
pub use peer::{Conn, Peer, TransportError, TransportResult};
pub use sanitize::sanitize;
