//! snare: a protocol tarpit.
//!
//! # Architecture Overview
//!
//! ```text
//!   peer ──▶ net::listener ──▶ net::server ──▶ session::dispatcher ──▶ protocols::<name>
//!            (admission)       (span, penalty,   (pre-delay, tarpit      (state machine)
//!                               MockConfig)       flags, handler table)        │
//!                                                                              ▼
//!                                                             timing + wire primitives
//!
//!   config file ──▶ config::watcher ──▶ CLI overrides ──▶ net::server (hot swap)
//!   SIGINT/SIGTERM ──▶ lifecycle::Shutdown ──▶ stop accepting ──▶ drain
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;

use snare::config::validation::validate_config;
use snare::config::watcher::{ConfigWatcher, Overrides};
use snare::config::{load_config, ConfigError, ServerConfig};
use snare::lifecycle::signals::spawn_signal_listener;
use snare::lifecycle::{drain_sessions, Drain, Shutdown};
use snare::net::{Listener, MockServer};
use snare::observability::{logging, metrics};
use snare::session::Protocol;

#[derive(Parser, Debug, Clone)]
#[command(name = "snare")]
#[command(about = "Protocol tarpit: fake handshakes that waste a scanner's time", long_about = None)]
struct Cli {
    /// TOML configuration file; watched for changes
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (all interfaces)
    #[arg(long)]
    port: Option<u16>,

    /// Protocol to emulate (http, ssh, mysql, mssql, rdp, telnet, redis, smtp, raw)
    #[arg(long)]
    protocol: Option<String>,

    /// Delay in milliseconds before the first byte
    #[arg(long)]
    delay: Option<u64>,

    /// Custom payload replacing the default banner or body
    #[arg(long)]
    payload: Option<String>,

    /// Tarpit mode: slow, endless responses
    #[arg(long)]
    tarpit: bool,

    /// Drip interval in ms; bytes are sent one at a time
    #[arg(long)]
    drip: Option<u64>,

    /// Maximum concurrent sessions
    #[arg(long = "max-conns")]
    max_conns: Option<usize>,

    /// HTTP status code (200, 401, 403, 404, 500)
    #[arg(long = "status-code")]
    status_code: Option<u16>,

    /// Named behavior preset (e.g. ssh-tarpit)
    #[arg(long)]
    preset: Option<String>,

    /// Hold connections open after responding
    #[arg(long = "never-complete")]
    never_complete: bool,
}

impl Cli {
    /// Flags override the file.
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(port) = self.port {
            config.listener.bind_address = format!("0.0.0.0:{}", port);
        }
        if let Some(max_conns) = self.max_conns {
            config.listener.max_connections = max_conns;
        }

        let mock = &mut config.mock;
        if let Some(protocol) = &self.protocol {
            mock.protocol = Protocol::from_name(protocol);
        }
        if let Some(delay) = self.delay {
            mock.delay_ms = delay;
        }
        if let Some(payload) = &self.payload {
            mock.payload = Some(payload.clone());
        }
        if self.tarpit {
            mock.tarpit = true;
        }
        if let Some(drip) = self.drip {
            mock.drip_interval_ms = drip;
            mock.drip_banner = drip > 0;
        }
        if let Some(status_code) = self.status_code {
            mock.status_code = status_code;
        }
        if let Some(preset) = &self.preset {
            mock.preset = Some(preset.clone());
        }
        if self.never_complete {
            mock.never_complete = true;
        }
    }

    fn resolve(&self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ServerConfig::default(),
        };
        self.apply(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.resolve()?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("snare v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = Listener::bind(&config.listener).await?;

    // Without a watcher the sender is dropped and the server sees no updates.
    let (_watcher, config_updates) = match &cli.config {
        Some(path) => {
            let cli_overrides = cli.clone();
            let overrides: Overrides = Box::new(move |reloaded| cli_overrides.apply(reloaded));
            let (watcher, file_updates) = ConfigWatcher::new(path, config.clone(), overrides);
            match watcher.run() {
                Ok(handle) => (Some(handle), file_updates),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
                    (None, mpsc::unbounded_channel().1)
                }
            }
        }
        None => (None, mpsc::unbounded_channel().1),
    };

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let drain_limit = Duration::from_secs(config.shutdown.drain_timeout_secs);
    let server = MockServer::new(config);
    let tracker = server.tracker();
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    if tracker.active_count() > 0 {
        tracing::info!(
            active = tracker.active_count(),
            drain_secs = drain_limit.as_secs(),
            "Waiting for running sessions"
        );
        match drain_sessions(&tracker, &shutdown, drain_limit).await {
            Drain::Idle => {}
            Drain::DeadlineReached => tracing::warn!(
                active = tracker.active_count(),
                "Drain deadline reached, dropping remaining sessions"
            ),
            Drain::Abandoned => {
                tracing::warn!(active = tracker.active_count(), "Drain abandoned")
            }
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
