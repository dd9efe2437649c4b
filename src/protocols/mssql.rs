//! MSSQL emulation: one truncated TDS pre-login response, then close.

use futures_util::future::BoxFuture;

use crate::session::{MockConfig, SessionEnd};
use crate::wire::{Frame, FrameBuilder, Peer, TransportResult};

const PACKET_TYPE_RESPONSE: u8 = 0x04;
const STATUS_END_OF_MESSAGE: u8 = 0x01;
const DECLARED_LENGTH: u16 = 0x001a;

const TOKEN_VERSION: u8 = 0x00;
const TOKEN_ENCRYPTION: u8 = 0x01;
const TOKEN_TERMINATOR: u8 = 0xff;
const ENCRYPT_REQUIRED: u8 = 0x02;

pub(crate) fn handler<'a>(
    peer: &'a mut Peer,
    _config: &'a MockConfig,
) -> BoxFuture<'a, TransportResult<SessionEnd>> {
    Box::pin(serve(peer))
}

pub async fn serve(peer: &mut Peer) -> TransportResult<SessionEnd> {
    peer.send(prelogin_response().as_bytes()).await?;
    Ok(SessionEnd::Completed)
}

/// Pre-login response advertising encryption as required.
///
/// The header declares 26 bytes while 25 are sent. Clients see a malformed
/// reply, which is the intended outcome.
pub fn prelogin_response() -> Frame {
    FrameBuilder::new()
        .u8("type", PACKET_TYPE_RESPONSE)
        .u8("status", STATUS_END_OF_MESSAGE)
        .u16_be("length", DECLARED_LENGTH)
        .u16_be("spid", 0)
        .u8("packet_id", 1)
        .u8("window", 0)
        .u8("version_token", TOKEN_VERSION)
        .u16_be("version_offset", 0x0010)
        .u16_be("version_length", 0x0006)
        .u8("encryption_token", TOKEN_ENCRYPTION)
        .u16_be("encryption_offset", 0x0016)
        .u16_be("encryption_length", 0x0001)
        .u8("terminator", TOKEN_TERMINATOR)
        .bytes("version", &[0x0e, 0x00, 0x00, 0x00, 0x00, 0x00])
        .u8("encryption", ENCRYPT_REQUIRED)
        .build()
}
