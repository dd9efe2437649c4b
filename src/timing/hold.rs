//! Bounded idle hold.

use std::time::Duration;

use crate::wire::Peer;

/// Deadline for each read while holding a connection.
pub const HOLD_READ_DEADLINE: Duration = Duration::from_secs(5 * 60);

/// Pause between reads so a chatty peer cannot make the hold spin.
pub const HOLD_READ_PAUSE: Duration = Duration::from_secs(1);

/// Keep the connection occupied until the peer goes away.
///
/// Incoming data is discarded. A peer that stays silent for
/// `HOLD_READ_DEADLINE` is treated as gone.
pub async fn hold_open(peer: &mut Peer) {
    let mut buf = [0u8; 1024];
    loop {
        if let Err(e) = peer.recv(&mut buf, HOLD_READ_DEADLINE).await {
            tracing::debug!(error = %e, "Hold released");
            return;
        }
        tokio::time::sleep(HOLD_READ_PAUSE).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test(start_paused = true)]
    async fn returns_when_peer_disconnects() {
        let (server, mut client) = tokio::io::duplex(64);
        client.write_all(b"junk").await.unwrap();
        drop(client);

        let mut peer = Peer::new(server);
        hold_open(&mut peer).await;
        assert_eq!(peer.bytes_read(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_peer_is_released_after_deadline() {
        let (server, _client) = tokio::io::duplex(64);
        let mut peer = Peer::new(server);

        let start = tokio::time::Instant::now();
        hold_open(&mut peer).await;
        assert!(start.elapsed() >= HOLD_READ_DEADLINE);
    }

    #[tokio::test(start_paused = true)]
    async fn paces_reads_from_a_chatty_peer() {
        let (server, mut client) = tokio::io::duplex(64);
        let mut peer = Peer::new(server);

        let writer = tokio::spawn(async move {
            for _ in 0..3 {
                client.write_all(b"x").await.unwrap();
                tokio::task::yield_now().await;
            }
        });

        let start = tokio::time::Instant::now();
        hold_open(&mut peer).await;
        writer.await.unwrap();
        // At least one pause happened before the client hung up.
        assert!(start.elapsed() >= HOLD_READ_PAUSE);
    }
}
