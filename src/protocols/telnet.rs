//! Telnet emulation.
//!
//! Both modes open with the same option negotiation. Normal mode then shows
//! a login prompt and stops. Tarpit mode runs a login loop that never
//! succeeds, modelled as a two-state machine.

use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::session::{MockConfig, SessionEnd};
use crate::timing::{drip_write, Tarpit};
use crate::wire::{Peer, TransportResult};

pub mod option {
    pub const TERMINAL_TYPE: u8 = 0x18;
    pub const TERMINAL_SPEED: u8 = 0x20;
    pub const X_DISPLAY_LOCATION: u8 = 0x23;
    pub const NEW_ENVIRON: u8 = 0x27;
}

pub const IAC: u8 = 0xff;
pub const DO: u8 = 0xfd;

/// Options the server asks the client to negotiate, in order.
const REQUESTED_OPTIONS: [u8; 4] = [
    option::TERMINAL_TYPE,
    option::TERMINAL_SPEED,
    option::X_DISPLAY_LOCATION,
    option::NEW_ENVIRON,
];

const NEGOTIATION_PAUSE: Duration = Duration::from_millis(100);
const LOGIN_READ_DEADLINE: Duration = Duration::from_secs(120);

const LOGIN_PROMPT: &str = "\r\nUser Access Verification\r\n\r\nUsername: ";

const BANNERS: [&str; 4] = [
    "\r\nUser Access Verification\r\n\r\n",
    "\r\nAuthorized Users Only\r\n\r\n",
    "\r\nWelcome to Ubuntu 20.04.3 LTS\r\n\r\n",
    "\r\nCisco IOS Software\r\n\r\n",
];

/// A banner is re-sent after every this many failed logins.
const BANNER_EVERY: u64 = 10;

/// IAC DO for every requested option.
pub fn negotiation() -> Vec<u8> {
    REQUESTED_OPTIONS
        .iter()
        .flat_map(|&opt| [IAC, DO, opt])
        .collect()
}

pub(crate) fn handler<'a>(
    peer: &'a mut Peer,
    config: &'a MockConfig,
) -> BoxFuture<'a, TransportResult<SessionEnd>> {
    Box::pin(serve(peer, config))
}

pub async fn serve(peer: &mut Peer, config: &MockConfig) -> TransportResult<SessionEnd> {
    let iac = negotiation();
    if config.drip_banner {
        drip_write(peer, &iac, config.drip_interval_ms).await?;
    } else {
        peer.send(&iac).await?;
    }
    tokio::time::sleep(NEGOTIATION_PAUSE).await;

    if config.tarpit {
        return serve_tarpit(peer).await;
    }

    peer.send(LOGIN_PROMPT.as_bytes()).await?;
    Ok(SessionEnd::Completed)
}

async fn serve_tarpit(peer: &mut Peer) -> TransportResult<SessionEnd> {
    let mut tarpit = Tarpit::new(500, 500, 10_000);
    let mut login = LoginLoop::new();
    let mut buf = [0u8; 256];

    peer.send(BANNERS[0].as_bytes()).await?;
    loop {
        peer.send(login.prompt().as_bytes()).await?;
        peer.recv(&mut buf, LOGIN_READ_DEADLINE).await?;
        tarpit.sleep().await;
        if let Some(reply) = login.submit() {
            peer.send(reply.as_bytes()).await?;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    AwaitingUsername,
    AwaitingPassword,
}

/// The endless login loop.
///
/// `AwaitingUsername --input--> AwaitingPassword --input--> AwaitingUsername`,
/// with a failure reply (and every tenth time a banner) on the second edge.
#[derive(Debug, Clone)]
pub struct LoginLoop {
    state: LoginState,
    attempts: u64,
}

impl LoginLoop {
    pub fn new() -> Self {
        Self {
            state: LoginState::AwaitingUsername,
            attempts: 0,
        }
    }

    pub fn state(&self) -> LoginState {
        self.state
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn prompt(&self) -> &'static str {
        match self.state {
            LoginState::AwaitingUsername => "Username: ",
            LoginState::AwaitingPassword => "Password: ",
        }
    }

    /// Consume one line of input. Returns the text to send before the next
    /// prompt, if any.
    pub fn submit(&mut self) -> Option<String> {
        match self.state {
            LoginState::AwaitingUsername => {
                self.state = LoginState::AwaitingPassword;
                None
            }
            LoginState::AwaitingPassword => {
                self.state = LoginState::AwaitingUsername;
                self.attempts += 1;
                let mut reply = failure_message(self.attempts);
                if self.attempts % BANNER_EVERY == 0 {
                    let idx = (self.attempts / BANNER_EVERY) as usize % BANNERS.len();
                    reply.push_str(BANNERS[idx]);
                }
                Some(reply)
            }
        }
    }
}

impl Default for LoginLoop {
    fn default() -> Self {
        Self::new()
    }
}

fn failure_message(attempts: u64) -> String {
    match attempts % 6 {
        0 => "\r\n% Login invalid\r\n\r\n".to_string(),
        1 => "\r\n% Authentication failed.\r\n\r\n".to_string(),
        2 => "\r\n% Access denied\r\n\r\n".to_string(),
        3 => "\r\n% Bad passwords\r\n\r\n".to_string(),
        4 => "\r\nLogin incorrect\r\n\r\n".to_string(),
        _ => format!(
            "\r\n% Too many failures - try again in {} seconds\r\n\r\n",
            attempts * 5
        ),
    }
}
