//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! MockConfig (built per accepted connection)
//!     → dispatcher.rs (pre-delay, tarpit normalization, handler table)
//!     → protocols::<name>::serve
//!     → SessionEnd
//! ```
//!
//! # Design Decisions
//! - Protocol selection is a closed enum; unknown names resolve to raw
//! - MockConfig is moved into the session and never shared
//! - Sessions end normally on any transport failure

pub mod config;
pub mod dispatcher;

pub use config::{MockConfig, Protocol};
pub use dispatcher::{handle_connection, handler_for, Handler};

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEnd {
    /// The handler ran its fixed sequence to the end.
    Completed,
    /// The peer issued a terminal command that the handler honors.
    Quit,
    /// EOF, transport error or an expired deadline.
    Disconnected,
    /// Shutdown interrupted the session.
    Aborted,
}

impl SessionEnd {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionEnd::Completed => "completed",
            SessionEnd::Quit => "quit",
            SessionEnd::Disconnected => "disconnected",
            SessionEnd::Aborted => "aborted",
        }
    }
}
