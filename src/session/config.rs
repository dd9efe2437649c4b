//! Per-session configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::timing::RandomSource;

/// Default per-byte interval when tarpit mode is on and none was given.
pub const TARPIT_DRIP_INTERVAL_MS: u64 = 1000;

/// The closed set of emulated protocols.
///
/// Unknown names resolve to `Raw` rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Protocol {
    Http,
    Ssh,
    Mysql,
    Mssql,
    Rdp,
    Telnet,
    Redis,
    Smtp,
    #[default]
    Raw,
}

impl Protocol {
    pub const ALL: [Protocol; 9] = [
        Protocol::Http,
        Protocol::Ssh,
        Protocol::Mysql,
        Protocol::Mssql,
        Protocol::Rdp,
        Protocol::Telnet,
        Protocol::Redis,
        Protocol::Smtp,
        Protocol::Raw,
    ];

    /// Resolve a selector name. Matching ignores case and surrounding spaces.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "http" => Protocol::Http,
            "ssh" => Protocol::Ssh,
            "mysql" => Protocol::Mysql,
            "mssql" => Protocol::Mssql,
            "rdp" => Protocol::Rdp,
            "telnet" => Protocol::Telnet,
            "redis" => Protocol::Redis,
            "smtp" => Protocol::Smtp,
            _ => Protocol::Raw,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Ssh => "ssh",
            Protocol::Mysql => "mysql",
            Protocol::Mssql => "mssql",
            Protocol::Rdp => "rdp",
            Protocol::Telnet => "telnet",
            Protocol::Redis => "redis",
            Protocol::Smtp => "smtp",
            Protocol::Raw => "raw",
        }
    }
}

impl From<String> for Protocol {
    fn from(name: String) -> Self {
        Protocol::from_name(&name)
    }
}

impl From<Protocol> for String {
    fn from(protocol: Protocol) -> Self {
        protocol.as_str().to_string()
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behavior of a single mocked session.
///
/// Built once per accepted connection and handed to the dispatcher by value.
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub protocol: Protocol,
    /// HTTP only: 200, 401, 403, 404 or 500. Anything else answers 200.
    pub status_code: u16,
    /// Fixed delay before the first byte, in milliseconds.
    pub delay_ms: u64,
    pub random_delay: bool,
    /// Replaces the protocol's default banner or body when non-empty.
    pub payload: Option<Vec<u8>>,
    pub drip_banner: bool,
    pub drip_interval_ms: u64,
    /// Hold the connection after responding instead of returning.
    pub never_complete: bool,
    /// Master switch for the stalling variants of each handler.
    pub tarpit: bool,
    pub rng: RandomSource,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Raw,
            status_code: 200,
            delay_ms: 0,
            random_delay: false,
            payload: None,
            drip_banner: false,
            drip_interval_ms: 0,
            never_complete: false,
            tarpit: false,
            rng: RandomSource::from_entropy(),
        }
    }
}

impl MockConfig {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            ..Self::default()
        }
    }

    /// The payload, if one is set and non-empty.
    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref().filter(|p| !p.is_empty())
    }

    /// Apply the flags tarpit mode implies.
    ///
    /// Tarpit forces random delays and dripped banners, and supplies a
    /// one-second drip interval when none was configured.
    pub fn resolved(mut self) -> Self {
        if self.tarpit {
            self.random_delay = true;
            self.drip_banner = true;
            if self.drip_interval_ms == 0 {
                self.drip_interval_ms = TARPIT_DRIP_INTERVAL_MS;
            }
        }
        self
    }
}
