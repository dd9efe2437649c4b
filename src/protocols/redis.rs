//! Redis emulation.
//!
//! Commands are matched by substring against an uppercased copy of whatever
//! the client sent. RESP is never parsed.

use std::borrow::Cow;
use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::session::{MockConfig, SessionEnd};
use crate::timing::Tarpit;
use crate::wire::{Peer, TransportResult};

pub const NOAUTH: &str = "-NOAUTH Authentication required.\r\n";

const NORMAL_READ_DEADLINE: Duration = Duration::from_secs(60);
const TARPIT_READ_DEADLINE: Duration = Duration::from_secs(120);

const AUTH_REPLIES: [&str; 5] = [
    "-WRONGPASS invalid username-password pair or user is disabled.\r\n",
    "-ERR invalid password\r\n",
    NOAUTH,
    "-ERR Client sent AUTH, but no password is set\r\n",
    "-NOPERM this user has no permissions to run the 'auth' command\r\n",
];

const FAKE_INFO: &str =
    "# Server\r\nredis_version:6.2.6\r\nredis_mode:standalone\r\nos:Linux 5.4.0-generic x86_64\r\n";

pub(crate) fn handler<'a>(
    peer: &'a mut Peer,
    config: &'a MockConfig,
) -> BoxFuture<'a, TransportResult<SessionEnd>> {
    Box::pin(serve(peer, config))
}

pub async fn serve(peer: &mut Peer, config: &MockConfig) -> TransportResult<SessionEnd> {
    if config.tarpit {
        return serve_tarpit(peer).await;
    }

    let mut tarpit: Option<Tarpit> = None;
    let mut buf = [0u8; 1024];
    loop {
        let n = peer.recv(&mut buf, NORMAL_READ_DEADLINE).await?;
        if config.random_delay {
            tarpit
                .get_or_insert_with(|| Tarpit::new(100, 200, 5000))
                .sleep()
                .await;
        }
        peer.send(NOAUTH.as_bytes()).await?;
        if is_quit(&buf[..n]) {
            return Ok(SessionEnd::Quit);
        }
    }
}

async fn serve_tarpit(peer: &mut Peer) -> TransportResult<SessionEnd> {
    let mut tarpit = Tarpit::new(200, 300, 8000);
    let mut responder = TarpitResponder::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = peer.recv(&mut buf, TARPIT_READ_DEADLINE).await?;
        tarpit.sleep().await;
        let reply = responder.reply(&buf[..n]);
        peer.send(reply.as_bytes()).await?;
    }
}

fn uppercased(input: &[u8]) -> String {
    String::from_utf8_lossy(input).to_uppercase()
}

/// Normal mode honors QUIT anywhere in the input.
pub fn is_quit(input: &[u8]) -> bool {
    uppercased(input).contains("QUIT")
}

/// Tarpit replies. QUIT is refused; only a disconnect ends the session.
#[derive(Debug, Clone, Default)]
pub struct TarpitResponder {
    auth_attempts: usize,
}

impl TarpitResponder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&mut self, input: &[u8]) -> Cow<'static, str> {
        let cmd = uppercased(input);
        if cmd.contains("AUTH") {
            self.auth_attempts += 1;
            Cow::Borrowed(AUTH_REPLIES[self.auth_attempts % AUTH_REPLIES.len()])
        } else if cmd.contains("PING") {
            Cow::Borrowed("+PONG\r\n")
        } else if cmd.contains("INFO") {
            Cow::Owned(format!("${}\r\n{}\r\n", FAKE_INFO.len(), FAKE_INFO))
        } else if cmd.contains("QUIT") {
            Cow::Borrowed("-ERR unknown command 'QUIT'\r\n")
        } else if cmd.contains("COMMAND") {
            Cow::Borrowed("*0\r\n")
        } else {
            Cow::Borrowed(NOAUTH)
        }
    }
}
