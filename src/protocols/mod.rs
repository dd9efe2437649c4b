//! Protocol handlers.
//!
//! # Responsibilities
//! - One module per emulated service, each a two-mode state machine
//! - Normal mode: a short plausible handshake, a rejection, then return
//! - Tarpit mode: loop on plausible stalling replies until the peer leaves
//!   (or, for SMTP, says QUIT)
//!
//! # Design Decisions
//! - Every read carries its own deadline, so an idle peer is always reaped
//! - Handlers return `TransportResult`; the dispatcher folds errors into
//!   `SessionEnd::Disconnected`
//! - Binary replies are built as named `Frame`s; text replies are constants
//! - Each module exposes `serve` and a crate-private `handler` for the
//!   dispatch table

pub mod http;
pub mod mssql;
pub mod mysql;
pub mod raw;
pub mod rdp;
pub mod redis;
pub mod smtp;
pub mod ssh;
pub mod telnet;
