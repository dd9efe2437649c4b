//! SMTP emulation.
//!
//! # Design Decisions
//! - Replies are computed by pure state machines; `serve` only moves bytes
//!   and applies the pauses they ask for
//! - Commands match by prefix on the uppercased, trimmed input
//! - The only attacker text ever echoed goes through `sanitize`

use std::borrow::Cow;
use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::session::{MockConfig, SessionEnd};
use crate::timing::{drip_write, Tarpit};
use crate::wire::{sanitize, Peer, TransportResult};

pub const BANNER: &[u8] = b"220 mail.example.com ESMTP Postfix (Ubuntu)\r\n";

const BANNER_DRIP_INTERVAL_MS: u64 = 100;
const NORMAL_READ_DEADLINE: Duration = Duration::from_secs(60);
const TARPIT_READ_DEADLINE: Duration = Duration::from_secs(300);

const NORMAL_EHLO: &str = "250-mail.example.com\r\n\
    250-PIPELINING\r\n\
    250-SIZE 10240000\r\n\
    250-VRFY\r\n\
    250-ETRN\r\n\
    250-AUTH PLAIN LOGIN\r\n\
    250-ENHANCEDSTATUSCODES\r\n\
    250-8BITMIME\r\n\
    250 DSN\r\n";

const TARPIT_EHLO: &str = "250-mail.example.com Hello\r\n\
    250-SIZE 52428800\r\n\
    250-8BITMIME\r\n\
    250-PIPELINING\r\n\
    250-AUTH PLAIN LOGIN CRAM-MD5\r\n\
    250-STARTTLS\r\n\
    250 SMTPUTF8\r\n";

const AUTH_FAILURES: [&str; 4] = [
    "535 5.7.8 Error: authentication failed\r\n",
    "454 4.7.0 Temporary authentication failure\r\n",
    "535 5.7.1 Credentials Rejected\r\n",
    "454 4.7.1 Relay access denied\r\n",
];

const DATA_REJECTED: &str = "451 4.3.0 Mail server temporarily rejected message\r\n";

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
    send_banner(peer, BANNER, config).await?;
    serve_normal(peer, config).await
}

async fn send_banner(peer: &mut Peer, banner: &[u8], config: &MockConfig) -> TransportResult<()> {
    if config.tarpit || config.drip_banner {
        let interval = match config.drip_interval_ms {
            0 => BANNER_DRIP_INTERVAL_MS,
            ms => ms,
        };
        drip_write(peer, banner, interval).await
    } else {
        peer.send(banner).await
    }
}

async fn serve_normal(peer: &mut Peer, config: &MockConfig) -> TransportResult<SessionEnd> {
    let mut tarpit: Option<Tarpit> = None;
    let mut buf = [0u8; 1024];
    loop {
        if config.random_delay {
            tarpit
                .get_or_insert_with(|| Tarpit::new(200, 500, 10_000))
                .sleep()
                .await;
        } else if config.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.delay_ms)).await;
        }

        let n = peer.recv(&mut buf, NORMAL_READ_DEADLINE).await?;
        let (reply, quit) = normal_reply(&String::from_utf8_lossy(&buf[..n]));
        peer.send(reply.as_bytes()).await?;
        if quit {
            return Ok(SessionEnd::Quit);
        }
    }
}

async fn serve_tarpit(peer: &mut Peer, config: &MockConfig) -> TransportResult<SessionEnd> {
    let mut session = TarpitSession::new();
    send_banner(peer, session.greet(), config).await?;

    let mut tarpit = Tarpit::new(300, 400, 15_000);
    let mut buf = [0u8; 4096];
    loop {
        let n = peer.recv(&mut buf, TARPIT_READ_DEADLINE).await?;
        tarpit.sleep().await;

        let Some(reply) = session.respond(&String::from_utf8_lossy(&buf[..n])) else {
            continue;
        };
        if let Some(pause) = reply.pause {
            tokio::time::sleep(pause).await;
        }
        peer.send(reply.text.as_bytes()).await?;
        if reply.close {
            return Ok(SessionEnd::Quit);
        }
    }
}

fn command(input: &str) -> String {
    input.trim().to_uppercase()
}

/// Normal-mode reply and whether the session ends after it.
pub fn normal_reply(input: &str) -> (&'static str, bool) {
    let cmd = command(input);
    if cmd.starts_with("HELO") || cmd.starts_with("EHLO") {
        (NORMAL_EHLO, false)
    } else if cmd.starts_with("QUIT") {
        ("221 2.0.0 Bye\r\n", true)
    } else if cmd.starts_with("AUTH") {
        ("535 5.7.8 Error: authentication failed\r\n", false)
    } else {
        ("502 5.5.2 Error: command not recognized\r\n", false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpState {
    /// Banner not yet sent.
    Greeting,
    AwaitingCommand,
    /// After DATA: everything is swallowed until the terminator.
    InData,
    Closed,
}

/// One step of the tarpit conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Extra stall before the reply is written.
    pub pause: Option<Duration>,
    pub text: Cow<'static, str>,
    pub close: bool,
}

impl Reply {
    fn now(text: &'static str) -> Self {
        Self {
            pause: None,
            text: Cow::Borrowed(text),
            close: false,
        }
    }

    fn after(pause: Duration, text: &'static str) -> Self {
        Self {
            pause: Some(pause),
            ..Self::now(text)
        }
    }
}

/// The tarpit conversation: accepts everything, delivers nothing.
#[derive(Debug, Clone)]
pub struct TarpitSession {
    state: SmtpState,
    auth_attempts: usize,
    /// Last bytes of message data, so a terminator split across reads is seen.
    data_tail: String,
}

impl TarpitSession {
    pub fn new() -> Self {
        Self {
            state: SmtpState::Greeting,
            auth_attempts: 0,
            data_tail: String::new(),
        }
    }

    pub fn state(&self) -> SmtpState {
        self.state
    }

    /// The banner. Moves the session to `AwaitingCommand`.
    pub fn greet(&mut self) -> &'static [u8] {
        self.state = SmtpState::AwaitingCommand;
        BANNER
    }

    /// Reply to one chunk of client input, if any reply is due.
    pub fn respond(&mut self, input: &str) -> Option<Reply> {
        match self.state {
            SmtpState::Greeting | SmtpState::Closed => None,
            SmtpState::InData => {
                let joined = format!("{}{}", self.data_tail, input);
                if is_data_terminator(input) || is_data_terminator(&joined) {
                    self.data_tail.clear();
                    self.state = SmtpState::AwaitingCommand;
                    Some(Reply::after(Duration::from_secs(2), DATA_REJECTED))
                } else {
                    self.data_tail = tail(&joined, TERMINATOR_LEN - 1).to_string();
                    None
                }
            }
            SmtpState::AwaitingCommand => Some(self.command_reply(&command(input))),
        }
    }

    fn command_reply(&mut self, cmd: &str) -> Reply {
        if cmd.starts_with("EHLO") || cmd.starts_with("HELO") {
            Reply::now(TARPIT_EHLO)
        } else if cmd.starts_with("AUTH") {
            self.auth_attempts += 1;
            Reply::now(AUTH_FAILURES[self.auth_attempts % AUTH_FAILURES.len()])
        } else if cmd.starts_with("STARTTLS") {
            Reply::now("220 2.0.0 Ready to start TLS\r\n")
        } else if cmd.starts_with("MAIL FROM") {
            Reply::now("250 2.1.0 Ok\r\n")
        } else if cmd.starts_with("RCPT TO") {
            Reply::now("250 2.1.5 Ok\r\n")
        } else if cmd.starts_with("DATA") {
            self.state = SmtpState::InData;
            self.data_tail.clear();
            Reply::now("354 End data with <CR><LF>.<CR><LF>\r\n")
        } else if cmd.starts_with("RSET") || cmd.starts_with("NOOP") {
            Reply::now("250 2.0.0 Ok\r\n")
        } else if cmd.starts_with("VRFY") {
            Reply::after(
                Duration::from_secs(1),
                "252 2.1.5 Cannot VRFY user, but will accept message\r\n",
            )
        } else if cmd.starts_with("QUIT") {
            self.state = SmtpState::Closed;
            Reply {
                close: true,
                ..Reply::after(Duration::from_secs(2), "221 2.0.0 Bye\r\n")
            }
        } else {
            let word = cmd.split(' ').next().unwrap_or_default();
            Reply {
                pause: None,
                text: Cow::Owned(format!(
                    "500 5.5.1 Error: unknown command '{}'\r\n",
                    sanitize(word)
                )),
                close: false,
            }
        }
    }
}

impl Default for TarpitSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Length of `\r\n.\r\n`.
const TERMINATOR_LEN: usize = 5;

/// The last `chars` characters of `text`.
fn tail(text: &str, chars: usize) -> &str {
    let start = text
        .char_indices()
        .rev()
        .nth(chars.saturating_sub(1))
        .map_or(0, |(i, _)| i);
    &text[start..]
}

/// A chunk that is the lone terminator line or ends with it.
pub fn is_data_terminator(chunk: &str) -> bool {
    chunk == ".\r\n" || chunk.ends_with("\r\n.\r\n")
}
