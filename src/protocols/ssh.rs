//! SSH emulation.
//!
//! Normal mode sends a version banner and reads the client's banner once.
//! Tarpit mode never sends a version string at all: RFC 4253 section 4.2 lets
//! a server send other lines first, so it sends random ones forever.

use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::session::{MockConfig, SessionEnd};
use crate::timing::{drip_write, hold_open, random_delay, RandomSource};
use crate::wire::{Peer, TransportResult};

pub const DEFAULT_BANNER: &[u8] = b"SSH-2.0-OpenSSH_8.2p1 Ubuntu-4ubuntu0.5\r\n";

const CLIENT_BANNER_DEADLINE: Duration = Duration::from_secs(5);

/// Write deadline for every byte of the pre-banner drip.
const DRIP_WRITE_DEADLINE: Duration = Duration::from_secs(30);

const TARPIT_INTERVAL_MS: u64 = 1000;

/// Pre-banner lines carry between 32 and 63 hex digits.
const LINE_MIN_DIGITS: usize = 32;
const LINE_DIGIT_SPREAD: u64 = 32;

pub(crate) fn handler<'a>(
    peer: &'a mut Peer,
    config: &'a MockConfig,
) -> BoxFuture<'a, TransportResult<SessionEnd>> {
    Box::pin(serve(peer, config))
}

pub async fn serve(peer: &mut Peer, config: &MockConfig) -> TransportResult<SessionEnd> {
    if config.tarpit {
        return serve_tarpit(peer, config).await;
    }

    let banner = config.payload().unwrap_or(DEFAULT_BANNER);
    if config.drip_banner {
        drip_write(peer, banner, config.drip_interval_ms).await?;
    } else {
        peer.send(banner).await?;
    }

    if config.never_complete {
        hold_open(peer).await;
        return Ok(SessionEnd::Disconnected);
    }

    let mut buf = [0u8; 256];
    let n = peer.recv(&mut buf, CLIENT_BANNER_DEADLINE).await?;
    tracing::debug!(client_banner_len = n, "Client banner received");

    if config.random_delay {
        random_delay(100, 500, &config.rng).await;
    }
    Ok(SessionEnd::Completed)
}

/// Endless pre-banner lines, one byte per interval.
async fn serve_tarpit(peer: &mut Peer, config: &MockConfig) -> TransportResult<SessionEnd> {
    let interval = Duration::from_millis(match config.drip_interval_ms {
        0 => TARPIT_INTERVAL_MS,
        ms => ms,
    });
    peer.set_write_deadline(DRIP_WRITE_DEADLINE);

    loop {
        let line = pre_banner_line(&config.rng);
        for byte in line.as_bytes() {
            peer.send(std::slice::from_ref(byte)).await?;
            tokio::time::sleep(interval).await;
        }
    }
}

/// A random hex line terminated by CRLF. Never starts with "SSH-".
pub fn pre_banner_line(rng: &RandomSource) -> String {
    let digits = LINE_MIN_DIGITS + rng.below(LINE_DIGIT_SPREAD) as usize;
    let mut line = rng.hex_string(digits);
    line.push_str("\r\n");
    line
}
