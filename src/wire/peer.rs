//! Connection handle with per-operation deadlines.
//!
//! # Responsibilities
//! - Own the session's byte stream for the lifetime of one session
//! - Put a deadline on every read and every write
//! - Collapse all transport failures into `TransportError`
//!
//! # Design Decisions
//! - The stream is type-erased so the handler table can hold plain function
//!   pointers; TCP streams and in-memory test streams go through the same path
//! - A read that returns zero bytes is a disconnect, not data

use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

/// Default deadline applied to every write.
pub const WRITE_DEADLINE: Duration = Duration::from_secs(30);

/// Upper bound on the final shutdown of the write half.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(1);

/// Any bidirectional byte stream a session can run over.
pub trait Conn: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> Conn for T where T: AsyncRead + AsyncWrite + Unpin + Send + ?Sized {}

/// Transport failures. Every variant means "the peer is gone" to a handler.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer closed its side of the connection.
    #[error("peer closed the connection")]
    Closed,

    /// A read or write did not complete in time.
    #[error("{op} deadline of {after:?} elapsed")]
    Deadline { op: &'static str, after: Duration },

    /// The underlying stream failed.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for operations on a peer.
pub type TransportResult<T> = Result<T, TransportError>;

/// The remote side of one session.
pub struct Peer {
    conn: Box<dyn Conn>,
    write_deadline: Duration,
    bytes_read: u64,
    bytes_written: u64,
}

impl Peer {
    pub fn new<C: Conn + 'static>(conn: C) -> Self {
        Self {
            conn: Box::new(conn),
            write_deadline: WRITE_DEADLINE,
            bytes_read: 0,
            bytes_written: 0,
        }
    }

    /// Override the deadline applied to every subsequent write.
    pub fn set_write_deadline(&mut self, deadline: Duration) {
        self.write_deadline = deadline;
    }

    /// Read once into `buf`, giving up after `deadline`.
    ///
    /// Returns the number of bytes read, always at least one.
    pub async fn recv(&mut self, buf: &mut [u8], deadline: Duration) -> TransportResult<usize> {
        match timeout(deadline, self.conn.read(buf)).await {
            Err(_) => Err(TransportError::Deadline {
                op: "read",
                after: deadline,
            }),
            Ok(Ok(0)) => Err(TransportError::Closed),
            Ok(Ok(n)) => {
                self.bytes_read += n as u64;
                Ok(n)
            }
            Ok(Err(e)) => Err(TransportError::Io(e)),
        }
    }

    /// Read and discard whatever the peer has already sent.
    ///
    /// Nothing arriving within `deadline` is not an error here.
    pub async fn drain(&mut self, deadline: Duration) {
        let mut buf = [0u8; 4096];
        if let Err(e) = self.recv(&mut buf, deadline).await {
            tracing::trace!(error = %e, "Nothing to drain");
        }
    }

    /// Write all of `data` within the write deadline.
    pub async fn send(&mut self, data: &[u8]) -> TransportResult<()> {
        let deadline = self.write_deadline;
        match timeout(deadline, self.conn.write_all(data)).await {
            Err(_) => Err(TransportError::Deadline {
                op: "write",
                after: deadline,
            }),
            Ok(Ok(())) => {
                self.bytes_written += data.len() as u64;
                Ok(())
            }
            Ok(Err(e)) => Err(TransportError::Io(e)),
        }
    }

    /// Best-effort flush and shutdown of the write half.
    pub async fn close(&mut self) {
        if let Ok(Err(e)) = timeout(SHUTDOWN_DEADLINE, self.conn.shutdown()).await {
            tracing::trace!(error = %e, "Shutdown failed");
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}
