//! Timing primitives shared by every protocol handler.
//!
//! # Data Flow
//! ```text
//! handler
//!     → backoff.rs (Tarpit: escalating per-session delay, random_delay)
//!     → drip.rs (byte-paced banner/body writes)
//!     → hold.rs (occupy a slot until the peer leaves)
//!     → entropy.rs (RandomSource threaded through MockConfig)
//! ```
//!
//! # Design Decisions
//! - All state is per-session; nothing here is shared across connections
//! - Every sleep is a tokio timer, so paused-clock tests run instantly
//! - No primitive blocks without a bound: holds and reads carry deadlines

pub mod backoff;
pub mod drip;
pub mod entropy;
pub mod hold;

pub use backoff::{random_delay, Tarpit};
pub use drip::drip_write;
pub use entropy::RandomSource;
pub use hold::hold_open;
