//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection (source IP)
//!     → penalty.rs (record visit, count recent visits)
//!     → scaled pre-delay in the session's MockConfig
//! ```
//!
//! # Design Decisions
//! - State is keyed by IP only; ports are ignored
//! - Jitter keeps the penalty from being fingerprinted as a fixed delay
//! - A periodic sweep bounds memory

pub mod penalty;

pub use penalty::{penalized_delay, PenaltyTracker};
