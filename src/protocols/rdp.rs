//! RDP emulation: one X.224 connection confirm, then close.

use futures_util::future::BoxFuture;

use crate::session::{MockConfig, SessionEnd};
use crate::wire::{Frame, FrameBuilder, Peer, TransportResult};

const TPKT_VERSION: u8 = 0x03;
const X224_CONNECTION_CONFIRM: u8 = 0xd0;
const TYPE_RDP_NEG_RSP: u8 = 0x02;
const PROTOCOL_RDP: u32 = 0;

pub(crate) fn handler<'a>(
    peer: &'a mut Peer,
    _config: &'a MockConfig,
) -> BoxFuture<'a, TransportResult<SessionEnd>> {
    Box::pin(serve(peer))
}

pub async fn serve(peer: &mut Peer) -> TransportResult<SessionEnd> {
    peer.send(connection_confirm().as_bytes()).await?;
    Ok(SessionEnd::Completed)
}

/// TPKT + X.224 connection confirm carrying an RDP negotiation response.
///
/// The layout is sent exactly as captured, including the 0x1234 source
/// reference and a negotiation length of 0x0100.
pub fn connection_confirm() -> Frame {
    let x224 = FrameBuilder::new()
        .u8("length_indicator", 0x0e)
        .u8("pdu_type", X224_CONNECTION_CONFIRM)
        .u16_be("dst_ref", 0x0000)
        .u16_be("src_ref", 0x1234)
        .u8("class", 0x00)
        .u8("neg_type", TYPE_RDP_NEG_RSP)
        .u8("neg_flags", 0x01)
        .u16_be("neg_length", 0x0001)
        .u32_le("selected_protocol", PROTOCOL_RDP)
        .build();

    FrameBuilder::new()
        .u8("tpkt_version", TPKT_VERSION)
        .u8("tpkt_reserved", 0)
        .u16_be("tpkt_length", 0x0013)
        .frame(x224)
        .build()
}
