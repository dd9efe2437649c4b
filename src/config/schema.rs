//! Configuration schema definitions.
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration. All types derive Serde traits for TOML.

use serde::{Deserialize, Serialize};

use crate::session::Protocol;

/// Root configuration for the deception server.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address and admission capacity.
    pub listener: ListenerConfig,

    /// Behavior applied to every admitted connection.
    pub mock: MockSettings,

    /// Reconnect penalty tracking.
    pub penalty: PenaltyConfig,

    pub observability: ObservabilityConfig,

    pub shutdown: ShutdownConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent sessions. Connections past this are closed on accept.
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 128,
        }
    }
}

/// The `[mock]` section: what each session pretends to be.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MockSettings {
    pub protocol: Protocol,

    /// Named preset that overrides the fields below.
    pub preset: Option<String>,

    /// HTTP status (200, 401, 403, 404, 500).
    pub status_code: u16,

    /// Fixed pre-delay, skipped in random-delay mode.
    pub delay_ms: u64,

    pub random_delay: bool,

    /// Replaces the default banner or body where the protocol allows it.
    pub payload: Option<String>,

    pub drip_banner: bool,

    /// Per-byte interval for dripped writes.
    pub drip_interval_ms: u64,

    /// Hold the connection after responding.
    pub never_complete: bool,

    /// Master switch for the endless stalling handlers.
    pub tarpit: bool,
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            protocol: Protocol::Http,
            preset: None,
            status_code: 200,
            delay_ms: 0,
            random_delay: false,
            payload: None,
            drip_banner: false,
            drip_interval_ms: 0,
            never_complete: false,
            tarpit: false,
        }
    }
}

/// Reconnect penalty: repeat visitors wait longer.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PenaltyConfig {
    pub enabled: bool,

    /// Sliding window for counting reconnects from one address.
    pub window_secs: u64,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            window_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level for this crate when `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Exporter listen address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Shutdown policy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Drop running sessions on shutdown instead of letting them finish.
    pub abort_sessions: bool,

    /// How long the binary waits for running sessions before exiting.
    pub drain_timeout_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            abort_sessions: false,
            drain_timeout_secs: 10,
        }
    }
}
