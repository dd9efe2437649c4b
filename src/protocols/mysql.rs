//! MySQL emulation.
//!
//! Sends a protocol-10 handshake, reads the login packet and refuses it with
//! error 1045. Tarpit mode keeps refusing every further packet, slower each
//! time, cycling through error messages that hint the next try might work.

use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::session::{MockConfig, SessionEnd};
use crate::timing::{random_delay, RandomSource, Tarpit};
use crate::wire::{Frame, FrameBuilder, Peer, TransportResult};

pub const PROTOCOL_VERSION: u8 = 0x0a;
pub const SERVER_VERSION: &[u8] = b"5.7.21-log";
const THREAD_ID: u32 = 0x2d;
const CAPABILITY_FLAGS: u16 = 0xf7ff;
const CHARSET_UTF8_GENERAL_CI: u8 = 0x21;
const STATUS_AUTOCOMMIT: u16 = 0x0002;

const ER_ACCESS_DENIED: u16 = 1045;
const SQLSTATE_ACCESS_DENIED: &[u8; 5] = b"28000";
const SQLSTATE_MARKER: u8 = b'#';
const ERR_PACKET_HEADER: u8 = 0xff;

const LOGIN_DEADLINE: Duration = Duration::from_secs(30);
const TARPIT_READ_DEADLINE: Duration = Duration::from_secs(60);

/// Sequence number of the first reply after the client's login packet.
const FIRST_REPLY_SEQUENCE: u8 = 2;

const DENIAL_MESSAGES: [&str; 7] = [
    "Access denied for user 'root'@'localhost' (using password: YES)",
    "Access denied for user 'root'@'localhost' (using password: NO)",
    "Your password has expired. To log in you must change it using a client that supports expired passwords.",
    "Access denied for user 'admin'@'localhost'",
    "Plugin 'mysql_native_password' is not loaded",
    "Host 'localhost' is blocked because of many connection errors",
    "Access denied; you need the SUPER privilege for this operation",
];

pub(crate) fn handler<'a>(
    peer: &'a mut Peer,
    config: &'a MockConfig,
) -> BoxFuture<'a, TransportResult<SessionEnd>> {
    Box::pin(serve(peer, config))
}

pub async fn serve(peer: &mut Peer, config: &MockConfig) -> TransportResult<SessionEnd> {
    peer.send(handshake(&config.rng).as_bytes()).await?;

    let mut buf = [0u8; 1024];
    peer.recv(&mut buf, LOGIN_DEADLINE).await?;

    if config.tarpit {
        return serve_tarpit(peer).await;
    }

    if config.random_delay {
        random_delay(200, 2000, &config.rng).await;
    }

    let denied = error_packet(
        ER_ACCESS_DENIED,
        SQLSTATE_ACCESS_DENIED,
        "Access denied for user 'root'@'localhost'",
        FIRST_REPLY_SEQUENCE,
    );
    peer.send(denied.as_bytes()).await?;
    Ok(SessionEnd::Completed)
}

async fn serve_tarpit(peer: &mut Peer) -> TransportResult<SessionEnd> {
    let mut tarpit = Tarpit::new(500, 500, 10_000);
    let mut denials = DenialRotation::new();
    let mut buf = [0u8; 1024];

    loop {
        peer.recv(&mut buf, TARPIT_READ_DEADLINE).await?;
        tarpit.sleep().await;
        let (message, sequence) = denials.next_denial();
        let packet = error_packet(ER_ACCESS_DENIED, SQLSTATE_ACCESS_DENIED, message, sequence);
        peer.send(packet.as_bytes()).await?;
    }
}

/// Message and sequence number for each successive tarpit denial.
#[derive(Debug, Clone)]
pub struct DenialRotation {
    index: usize,
    sequence: u8,
}

impl DenialRotation {
    pub fn new() -> Self {
        Self {
            index: 0,
            sequence: FIRST_REPLY_SEQUENCE,
        }
    }

    /// The next message and sequence byte. The sequence wraps at 256.
    pub fn next_denial(&mut self) -> (&'static str, u8) {
        let out = (DENIAL_MESSAGES[self.index % DENIAL_MESSAGES.len()], self.sequence);
        self.index += 1;
        self.sequence = self.sequence.wrapping_add(1);
        out
    }
}

impl Default for DenialRotation {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap `payload` in the 4-byte packet header.
fn packet(payload: Frame, sequence: u8) -> Frame {
    FrameBuilder::new()
        .u24_le("payload_length", payload.len() as u32)
        .u8("sequence_id", sequence)
        .frame(payload)
        .build()
}

/// Initial handshake (protocol 10) with a fresh 8-byte salt.
pub fn handshake(rng: &RandomSource) -> Frame {
    let mut salt = [0u8; 8];
    rng.fill(&mut salt);

    let payload = FrameBuilder::new()
        .u8("protocol_version", PROTOCOL_VERSION)
        .nul_terminated("server_version", SERVER_VERSION)
        .u32_le("thread_id", THREAD_ID)
        .nul_terminated("auth_plugin_data", &salt)
        .u16_le("capability_flags", CAPABILITY_FLAGS)
        .u8("character_set", CHARSET_UTF8_GENERAL_CI)
        .u16_le("status_flags", STATUS_AUTOCOMMIT)
        .zeros("reserved", 13)
        .build();
    packet(payload, 0)
}

/// ERR packet: 0xff, error code, '#', SQL state, message.
pub fn error_packet(code: u16, sql_state: &[u8; 5], message: &str, sequence: u8) -> Frame {
    let payload = FrameBuilder::new()
        .u8("header", ERR_PACKET_HEADER)
        .u16_le("error_code", code)
        .u8("sql_state_marker", SQLSTATE_MARKER)
        .bytes("sql_state", sql_state)
        .bytes("error_message", message.as_bytes())
        .build();
    packet(payload, sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_fixed_fields() {
        let frame = handshake(&RandomSource::seeded(1));
        let bytes = frame.as_bytes();

        assert_eq!(bytes[3], 0x00, "sequence id");
        assert_eq!(bytes[4], 0x0a, "protocol version");
        assert_eq!(&bytes[5..16], b"5.7.21-log\0");
        assert_eq!(frame.get("thread_id"), Some(&[0x2d, 0, 0, 0][..]));
        assert_eq!(frame.get("capability_flags"), Some(&[0xff, 0xf7][..]));
        assert_eq!(frame.get("character_set"), Some(&[0x21][..]));
        assert_eq!(frame.get("status_flags"), Some(&[0x02, 0x00][..]));
        assert_eq!(frame.get("reserved"), Some(&[0u8; 13][..]));
    }

    #[test]
    fn handshake_length_prefix_matches_payload() {
        let frame = handshake(&RandomSource::seeded(2));
        let bytes = frame.as_bytes();
        let declared = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]) as usize;
        assert_eq!(declared, bytes.len() - 4);
        assert_eq!(declared, 43);
    }

    #[test]
    fn handshake_salt_is_fresh() {
        let a = handshake(&RandomSource::seeded(3));
        let b = handshake(&RandomSource::seeded(4));
        let salt_a = a.get("auth_plugin_data").unwrap();
        assert_eq!(salt_a.len(), 9);
        assert_eq!(salt_a[8], 0);
        assert_ne!(salt_a, b.get("auth_plugin_data").unwrap());
    }

    #[test]
    fn error_packet_layout() {
        let frame = error_packet(1045, b"28000", "nope", 2);
        assert_eq!(
            frame.as_bytes(),
            &[9, 0, 0, 2, 0xff, 0x15, 0x04, b'#', b'2', b'8', b'0', b'0', b'0', b'n', b'o', b'p', b'e']
        );
    }

    #[test]
    fn denial_rotation_cycles_messages_and_wraps_sequence() {
        let mut rotation = DenialRotation::new();
        let first: Vec<_> = (0..7).map(|_| rotation.next_denial().0).collect();
        assert_eq!(first, DENIAL_MESSAGES.to_vec());
        assert_eq!(rotation.next_denial().0, DENIAL_MESSAGES[0]);

        let mut rotation = DenialRotation::new();
        let sequences: Vec<u8> = (0..300).map(|_| rotation.next_denial().1).collect();
        assert_eq!(sequences[0], 2);
        assert_eq!(sequences[253], 255);
        assert_eq!(sequences[254], 0);
    }
}
