//! Network deception engine.
//!
//! Impersonates the handshake and authentication phase of common server
//! protocols to absorb and delay unauthenticated probing traffic.

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod protocols;
pub mod security;
pub mod session;
pub mod timing;
pub mod wire;

pub use config::schema::ServerConfig;
pub use lifecycle::Shutdown;
pub use net::MockServer;
pub use session::{handle_connection, MockConfig, Protocol, SessionEnd};
