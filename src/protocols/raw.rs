//! Raw fallback: the configured payload (dripped on request) or a fixed
//! refusal line sent at once.

use futures_util::future::BoxFuture;

use crate::session::{MockConfig, SessionEnd};
use crate::timing::{drip_write, hold_open};
use crate::wire::{Peer, TransportResult};

pub const DEFAULT_RESPONSE: &[u8] = b"Access Denied\n";

pub(crate) fn handler<'a>(
    peer: &'a mut Peer,
    config: &'a MockConfig,
) -> BoxFuture<'a, TransportResult<SessionEnd>> {
    Box::pin(serve(peer, config))
}

pub async fn serve(peer: &mut Peer, config: &MockConfig) -> TransportResult<SessionEnd> {
    match config.payload() {
        Some(payload) if config.drip_banner => {
            drip_write(peer, payload, config.drip_interval_ms).await?
        }
        Some(payload) => peer.send(payload).await?,
        None => peer.send(DEFAULT_RESPONSE).await?,
    }

    if config.never_complete {
        hold_open(peer).await;
        return Ok(SessionEnd::Disconnected);
    }
    Ok(SessionEnd::Completed)
}
