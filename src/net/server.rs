//! The accept loop.
//!
//! # Responsibilities
//! - Admit or reject each accepted connection
//! - Build a fresh `MockConfig` per session from the current behavior
//! - Apply the reconnect penalty
//! - Run each session on its own task inside a `session` span
//! - Apply validated config updates to sessions accepted afterwards
//! - Stop accepting on shutdown
//!
//! # Design Decisions
//! - Running sessions are left alone on shutdown unless
//!   `shutdown.abort_sessions` is set. Tarpits keep their peers engaged
//!   until the process exits.
//! - Behavior is swapped atomically; a session never sees a reload

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::Instrument;

use crate::config::{Behavior, ListenerConfig, ServerConfig, ShutdownConfig};
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{Admission, ConnectionPermit, Listener, ListenerError};
use crate::observability::metrics;
use crate::security::{penalized_delay, PenaltyTracker};
use crate::session::{handle_connection, SessionEnd};

/// How often idle penalty entries are swept.
const PENALTY_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Pause after a failed accept, so a persistent error cannot spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// The deception server.
pub struct MockServer {
    listener_config: ListenerConfig,
    shutdown_config: ShutdownConfig,
    behavior: Arc<ArcSwap<Behavior>>,
    tracker: ConnectionTracker,
    penalties: PenaltyTracker,
}

impl MockServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            behavior: Arc::new(ArcSwap::from_pointee(Behavior::from_config(&config))),
            listener_config: config.listener,
            shutdown_config: config.shutdown,
            tracker: ConnectionTracker::new(),
            penalties: PenaltyTracker::new(),
        }
    }

    /// Handle on the running-session count.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Serve until `shutdown` fires.
    pub async fn run(
        self,
        listener: Listener,
        mut config_updates: mpsc::UnboundedReceiver<ServerConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        let addr = listener.local_addr().map_err(ListenerError::Bind)?;
        tracing::info!(
            address = %addr,
            max_connections = listener.max_connections(),
            protocol = %self.behavior.load().mock.protocol,
            tarpit = self.behavior.load().mock.tarpit,
            "Mock server starting"
        );

        tokio::spawn(sweep_penalties(
            self.penalties.clone(),
            Arc::clone(&self.behavior),
            shutdown.resubscribe(),
        ));

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(Admission::Admitted { stream, peer, permit }) => {
                        self.spawn_session(stream, peer, permit, &shutdown);
                    }
                    Ok(Admission::Rejected { peer }) => {
                        tracing::warn!(peer = %peer, "Connection limit reached, rejecting");
                        metrics::record_rejected();
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
                Some(new_config) = config_updates.recv() => {
                    self.apply_update(new_config);
                }
                _ = shutdown.recv() => {
                    tracing::info!(
                        active = self.tracker.active_count(),
                        abort_sessions = self.shutdown_config.abort_sessions,
                        "Shutdown signal received, no longer accepting"
                    );
                    break;
                }
            }
        }

        Ok(())
    }

    fn apply_update(&self, new_config: ServerConfig) {
        if new_config.listener != self.listener_config {
            tracing::warn!("Listener changes take effect only after a restart");
        }
        if new_config.shutdown != self.shutdown_config {
            tracing::warn!("Shutdown policy changes take effect only after a restart");
        }

        let behavior = Behavior::from_config(&new_config);
        tracing::info!(
            protocol = %behavior.mock.protocol,
            preset = ?behavior.mock.preset,
            tarpit = behavior.mock.tarpit,
            penalty = behavior.penalty.enabled,
            "Configuration reloaded"
        );
        self.behavior.store(Arc::new(behavior));
    }

    fn spawn_session(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        permit: ConnectionPermit,
        shutdown: &broadcast::Receiver<()>,
    ) {
        // Dripped writes must leave one segment per byte.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(peer = %peer, error = %e, "Failed to disable Nagle");
        }

        let behavior = self.behavior.load();
        let mut config = behavior.session_config();
        if behavior.penalty.enabled {
            let window = Duration::from_secs(behavior.penalty.window_secs);
            let attempts = self.penalties.record(peer.ip(), window);
            if attempts > 1 {
                config.delay_ms = penalized_delay(config.delay_ms, attempts, &config.rng);
                tracing::debug!(
                    peer = %peer.ip(),
                    attempts,
                    delay_ms = config.delay_ms,
                    "Reconnect penalty applied"
                );
            }
        }

        let guard = self.tracker.track();
        let protocol = config.protocol;
        let span = tracing::info_span!(
            "session",
            session_id = %guard.id(),
            peer = %peer,
            protocol = %protocol
        );
        let abort_on_shutdown = self
            .shutdown_config
            .abort_sessions
            .then(|| shutdown.resubscribe());
        let active = self.tracker.active_count();

        tokio::spawn(
            async move {
                // Locals drop in reverse: the slot frees before the count falls.
                let _guard = guard;
                let _permit = permit;
                let started = Instant::now();
                tracing::info!(active, "Session started");
                metrics::record_session_started(protocol);

                let end = match abort_on_shutdown {
                    Some(mut cancel) => {
                        tokio::select! {
                            end = handle_connection(stream, config) => end,
                            _ = cancel.recv() => SessionEnd::Aborted,
                        }
                    }
                    None => handle_connection(stream, config).await,
                };

                let held = started.elapsed();
                metrics::record_session_finished(protocol, end, held);
                tracing::info!(
                    end = end.as_str(),
                    held_ms = held.as_millis() as u64,
                    "Session ended"
                );
            }
            .instrument(span),
        );
    }
}

/// Periodically forget addresses that have gone quiet.
async fn sweep_penalties(
    penalties: PenaltyTracker,
    behavior: Arc<ArcSwap<Behavior>>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(PENALTY_SWEEP_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let window = Duration::from_secs(behavior.load().penalty.window_secs);
                let dropped = penalties.sweep(window);
                if dropped > 0 {
                    tracing::debug!(dropped, tracked = penalties.tracked(), "Penalty table swept");
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}
