//! Protocol dispatcher.
//!
//! # Responsibilities
//! - Apply the fixed pre-delay
//! - Normalize tarpit-implied flags
//! - Route to exactly one protocol handler through the handler table
//! - Absorb transport failures: a vanished peer is an ordinary ending

use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::protocols;
use crate::session::{MockConfig, Protocol, SessionEnd};
use crate::wire::{Conn, Peer, TransportResult};

/// A protocol handler: runs one session over `peer` with `config`.
pub type Handler =
    for<'a> fn(&'a mut Peer, &'a MockConfig) -> BoxFuture<'a, TransportResult<SessionEnd>>;

/// The handler table. Exhaustive over `Protocol`.
pub fn handler_for(protocol: Protocol) -> Handler {
    match protocol {
        Protocol::Http => protocols::http::handler,
        Protocol::Ssh => protocols::ssh::handler,
        Protocol::Mysql => protocols::mysql::handler,
        Protocol::Mssql => protocols::mssql::handler,
        Protocol::Rdp => protocols::rdp::handler,
        Protocol::Telnet => protocols::telnet::handler,
        Protocol::Redis => protocols::redis::handler,
        Protocol::Smtp => protocols::smtp::handler,
        Protocol::Raw => protocols::raw::handler,
    }
}

/// Run one mocked session to its end.
///
/// May sleep for the full fixed delay before any byte is sent. Never returns
/// an error: transport failures end the session as `Disconnected`.
pub async fn handle_connection<C: Conn + 'static>(conn: C, config: MockConfig) -> SessionEnd {
    if !config.random_delay && config.delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(config.delay_ms)).await;
    }

    let config = config.resolved();
    let mut peer = Peer::new(conn);
    let handler = handler_for(config.protocol);

    let end = match handler(&mut peer, &config).await {
        Ok(end) => end,
        Err(e) => {
            tracing::debug!(error = %e, "Peer gone");
            SessionEnd::Disconnected
        }
    };
    peer.close().await;

    tracing::debug!(
        protocol = %config.protocol,
        end = end.as_str(),
        bytes_read = peer.bytes_read(),
        bytes_written = peer.bytes_written(),
        "Session finished"
    );
    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn raw_default_is_access_denied() {
        let (server, mut client) = tokio::io::duplex(256);
        let end = handle_connection(server, MockConfig::new(Protocol::Raw)).await;
        assert_eq!(end, SessionEnd::Completed);

        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"Access Denied\n");
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_delay_precedes_first_byte() {
        let (server, mut client) = tokio::io::duplex(256);
        let mut config = MockConfig::new(Protocol::Raw);
        config.delay_ms = 1500;

        let start = tokio::time::Instant::now();
        let session = tokio::spawn(handle_connection(server, config));
        let mut first = [0u8; 1];
        client.read_exact(&mut first).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(1500));
        session.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn random_delay_mode_skips_fixed_delay() {
        let (server, mut client) = tokio::io::duplex(256);
        let mut config = MockConfig::new(Protocol::Raw);
        config.delay_ms = 1500;
        config.random_delay = true;

        let start = tokio::time::Instant::now();
        handle_connection(server, config).await;
        assert!(start.elapsed() < Duration::from_millis(1500));

        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"Access Denied\n");
    }

    #[tokio::test]
    async fn transport_failure_is_not_an_error() {
        let (server, client) = tokio::io::duplex(256);
        drop(client);
        let end = handle_connection(server, MockConfig::new(Protocol::Mssql)).await;
        assert_eq!(end, SessionEnd::Disconnected);
    }
}
