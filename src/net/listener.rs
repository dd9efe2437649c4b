//! TCP listener with non-blocking admission control.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Admit at most `max_connections` concurrent sessions
//! - Close surplus connections at once instead of queueing them
//!
//! # Design Decisions
//! - A slot is taken with `try_acquire_owned`; the accept loop never waits on
//!   capacity, so a flood cannot stall admission of later peers once slots free
//! - The slot lives in a `ConnectionPermit` owned by the session task and is
//!   released on drop, on every exit path

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind(std::io::Error),
    /// Failed to accept connection.
    Accept(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
            ListenerError::Accept(e) => write!(f, "Failed to accept: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {}

/// Outcome of one accept.
#[derive(Debug)]
pub enum Admission {
    /// A slot was free. The permit must live as long as the session.
    Admitted {
        stream: TcpStream,
        peer: SocketAddr,
        permit: ConnectionPermit,
    },
    /// Every slot was taken; the stream has already been dropped.
    Rejected { peer: SocketAddr },
}

/// A bounded TCP listener that limits concurrent sessions.
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Semaphore to limit concurrent sessions.
    connection_limit: Arc<Semaphore>,
    /// Configured maximum sessions.
    max_connections: usize,
}

impl Listener {
    /// Bind to the configured address with connection limits.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
            ListenerError::Bind(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;

        let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
        Ok(Self::new(listener, config.max_connections))
    }

    /// Wrap an already bound listener.
    pub fn new(inner: TcpListener, max_connections: usize) -> Self {
        if let Ok(local_addr) = inner.local_addr() {
            tracing::info!(
                address = %local_addr,
                max_connections,
                "Listener bound"
            );
        }

        Self {
            inner,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        }
    }

    /// Accept the next connection and try to give it a slot.
    pub async fn accept(&self) -> Result<Admission, ListenerError> {
        let (stream, peer) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        match self.connection_limit.clone().try_acquire_owned() {
            Ok(permit) => {
                tracing::debug!(
                    peer_addr = %peer,
                    available_permits = self.connection_limit.available_permits(),
                    "Connection admitted"
                );
                Ok(Admission::Admitted {
                    stream,
                    peer,
                    permit: ConnectionPermit { _permit: permit },
                })
            }
            Err(_) => {
                drop(stream);
                Ok(Admission::Rejected { peer })
            }
        }
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Get current available session slots.
    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    /// Get configured maximum sessions.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// A permit representing a session slot.
///
/// When dropped, the slot is released back to the pool, even if the session
/// task panicked.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: OwnedSemaphorePermit,
}
