//! Byte-paced writes.

use std::time::Duration;

use crate::wire::{Peer, TransportResult};

/// Write `data` one byte at a time, sleeping `interval_ms` after each byte.
///
/// Stops at the first failed write. On success every byte has been written,
/// in order. An interval of zero writes the bytes back to back.
pub async fn drip_write(peer: &mut Peer, data: &[u8], interval_ms: u64) -> TransportResult<()> {
    let interval = Duration::from_millis(interval_ms);
    for byte in data {
        peer.send(std::slice::from_ref(byte)).await?;
        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test(start_paused = true)]
    async fn writes_every_byte_in_order_and_takes_time() {
        let (server, mut client) = tokio::io::duplex(1024);
        let mut peer = Peer::new(server);

        let start = tokio::time::Instant::now();
        drip_write(&mut peer, b"hello", 100).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
        drop(peer);

        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_does_not_sleep() {
        let (server, mut client) = tokio::io::duplex(1024);
        let mut peer = Peer::new(server);

        let start = tokio::time::Instant::now();
        drip_write(&mut peer, b"abc", 0).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
        drop(peer);

        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"abc");
    }

    #[tokio::test]
    async fn empty_data_is_a_no_op() {
        let (server, _client) = tokio::io::duplex(16);
        let mut peer = Peer::new(server);
        drip_write(&mut peer, b"", 1000).await.unwrap();
        assert_eq!(peer.bytes_written(), 0);
    }

    #[tokio::test]
    async fn aborts_when_peer_is_gone() {
        let (server, client) = tokio::io::duplex(16);
        drop(client);
        let mut peer = Peer::new(server);
        assert!(drip_write(&mut peer, b"abc", 0).await.is_err());
        assert_eq!(peer.bytes_written(), 0);
    }
}
