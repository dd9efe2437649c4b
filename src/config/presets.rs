//! Named behavior presets.
//!
//! A preset replaces the `[mock]` behavior fields wholesale and can switch on
//! the reconnect penalty. `Behavior` is the result of applying the selected
//! preset (if any) to a loaded configuration.

use crate::config::schema::{MockSettings, PenaltyConfig, ServerConfig};
use crate::session::{MockConfig, Protocol};
use crate::timing::RandomSource;

/// A fixed behavior bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub protocol: Protocol,
    pub banner: Option<&'static str>,
    pub status_code: u16,
    pub delay_ms: u64,
    pub random_delay: bool,
    pub drip_banner: bool,
    pub drip_interval_ms: u64,
    pub never_complete: bool,
    /// Reconnect penalty window, when the preset enables it.
    pub penalty_window_secs: Option<u64>,
}

const BASE: Preset = Preset {
    name: "",
    protocol: Protocol::Raw,
    banner: None,
    status_code: 200,
    delay_ms: 0,
    random_delay: false,
    drip_banner: false,
    drip_interval_ms: 0,
    never_complete: false,
    penalty_window_secs: None,
};

pub const PRESETS: [Preset; 11] = [
    Preset {
        name: "ssh-secure",
        protocol: Protocol::Ssh,
        banner: Some("SSH-2.0-OpenSSH_9.6p1 Debian-4\r\n"),
        ..BASE
    },
    Preset {
        name: "ssh-tarpit",
        protocol: Protocol::Ssh,
        banner: Some("SSH-2.0-OpenSSH_9.6p1\r\n"),
        delay_ms: 30_000,
        random_delay: true,
        drip_banner: true,
        drip_interval_ms: 100,
        never_complete: true,
        penalty_window_secs: Some(60),
        ..BASE
    },
    Preset {
        name: "http-401",
        protocol: Protocol::Http,
        status_code: 401,
        delay_ms: 500,
        ..BASE
    },
    Preset {
        name: "http-403",
        protocol: Protocol::Http,
        status_code: 403,
        delay_ms: 500,
        ..BASE
    },
    Preset {
        name: "http-404",
        protocol: Protocol::Http,
        status_code: 404,
        delay_ms: 500,
        ..BASE
    },
    Preset {
        name: "redis-secure",
        protocol: Protocol::Redis,
        banner: Some("-NOAUTH Authentication required.\r\n"),
        delay_ms: 500,
        ..BASE
    },
    Preset {
        name: "mysql-secure",
        protocol: Protocol::Mysql,
        banner: Some("8.4.0-MySQL Community Server - GPL"),
        delay_ms: 1500,
        ..BASE
    },
    Preset {
        name: "mysql-tarpit",
        protocol: Protocol::Mysql,
        banner: Some("8.4.0-MySQL Community Server"),
        random_delay: true,
        drip_banner: true,
        drip_interval_ms: 200,
        never_complete: true,
        penalty_window_secs: Some(60),
        ..BASE
    },
    Preset {
        name: "rdp-secure",
        protocol: Protocol::Rdp,
        delay_ms: 2000,
        ..BASE
    },
    Preset {
        name: "telnet-secure",
        protocol: Protocol::Telnet,
        banner: Some("Connection refused by security policy.\r\n"),
        delay_ms: 500,
        ..BASE
    },
    Preset {
        name: "raw-tarpit",
        protocol: Protocol::Raw,
        random_delay: true,
        drip_banner: true,
        drip_interval_ms: 1000,
        never_complete: true,
        penalty_window_secs: Some(60),
        ..BASE
    },
];

/// Find a preset by name. Names are matched exactly.
pub fn lookup(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|preset| preset.name == name)
}

impl Preset {
    /// The `[mock]` section this preset stands for.
    pub fn settings(&self) -> MockSettings {
        MockSettings {
            protocol: self.protocol,
            preset: Some(self.name.to_string()),
            status_code: self.status_code,
            delay_ms: self.delay_ms,
            random_delay: self.random_delay,
            payload: self.banner.map(str::to_string),
            drip_banner: self.drip_banner,
            drip_interval_ms: self.drip_interval_ms,
            never_complete: self.never_complete,
            tarpit: false,
        }
    }
}

/// Effective per-connection behavior after preset resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Behavior {
    pub mock: MockSettings,
    pub penalty: PenaltyConfig,
}

impl Behavior {
    pub fn from_config(config: &ServerConfig) -> Self {
        let preset = config.mock.preset.as_deref().and_then(lookup);
        match preset {
            Some(preset) => {
                let penalty = match preset.penalty_window_secs {
                    Some(window_secs) => PenaltyConfig {
                        enabled: true,
                        window_secs,
                    },
                    None => config.penalty.clone(),
                };
                Self {
                    mock: preset.settings(),
                    penalty,
                }
            }
            None => Self {
                mock: config.mock.clone(),
                penalty: config.penalty.clone(),
            },
        }
    }

    /// A fresh session configuration with its own random source.
    pub fn session_config(&self) -> MockConfig {
        let mock = &self.mock;
        MockConfig {
            protocol: mock.protocol,
            status_code: mock.status_code,
            delay_ms: mock.delay_ms,
            random_delay: mock.random_delay,
            payload: mock.payload.as_ref().map(|p| p.as_bytes().to_vec()),
            drip_banner: mock.drip_banner,
            drip_interval_ms: mock.drip_interval_ms,
            never_complete: mock.never_complete,
            tarpit: mock.tarpit,
            rng: RandomSource::from_entropy(),
        }
    }
}
