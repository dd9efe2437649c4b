//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use snare::config::ServerConfig;
use snare::lifecycle::Shutdown;
use snare::net::{ConnectionTracker, Listener, ListenerError, MockServer};

/// In-memory connection.
///
/// Each read returns the next scripted chunk whole; once the script runs out
/// reads return EOF. Everything written is captured. With a write limit set,
/// writes past the limit fail as if the peer had gone.
pub struct MockStream {
    input: Vec<Vec<u8>>,
    output: Arc<Mutex<Vec<u8>>>,
    write_limit: Option<usize>,
}

impl MockStream {
    pub fn new<I, C>(chunks: I) -> (Self, Arc<Mutex<Vec<u8>>>)
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        let output = Arc::new(Mutex::new(Vec::new()));
        let mut input: Vec<Vec<u8>> = chunks.into_iter().map(|c| c.as_ref().to_vec()).collect();
        input.reverse();
        (
            Self {
                input,
                output: Arc::clone(&output),
                write_limit: None,
            },
            output,
        )
    }

    /// No input; writes fail after `limit` bytes.
    pub fn sink(limit: usize) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let (mut stream, output) = Self::new(Vec::<Vec<u8>>::new());
        stream.write_limit = Some(limit);
        (stream, output)
    }

    pub fn with_write_limit(mut self, limit: usize) -> Self {
        self.write_limit = Some(limit);
        self
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Some(mut chunk) = self.input.pop() {
            let n = chunk.len().min(buf.remaining());
            buf.put_slice(&chunk[..n]);
            if n < chunk.len() {
                self.input.push(chunk.split_off(n));
            }
        }
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut output = self.output.lock().unwrap();
        let room = match self.write_limit {
            Some(limit) => limit.saturating_sub(output.len()),
            None => data.len(),
        };
        if room == 0 {
            return Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()));
        }
        let n = room.min(data.len());
        output.extend_from_slice(&data[..n]);
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

pub fn captured(output: &Arc<Mutex<Vec<u8>>>) -> Vec<u8> {
    output.lock().unwrap().clone()
}

pub fn captured_text(output: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8_lossy(&captured(output)).into_owned()
}

/// A server running on 127.0.0.1 with an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub tracker: ConnectionTracker,
    pub updates: mpsc::UnboundedSender<ServerConfig>,
    pub handle: JoinHandle<Result<(), ListenerError>>,
}

pub async fn start_server(config: ServerConfig) -> TestServer {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let listener = Listener::new(tcp, config.listener.max_connections);

    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server = MockServer::new(config);
    let tracker = server.tracker();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, config_updates, server_shutdown).await });

    TestServer {
        addr,
        shutdown,
        tracker,
        updates,
        handle,
    }
}

/// Poll until `tracker` reports `expected` running sessions.
pub async fn wait_for_active(tracker: &ConnectionTracker, expected: u64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while tracker.active_count() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| {
        panic!(
            "expected {} active sessions, have {}",
            expected,
            tracker.active_count()
        )
    });
}

/// Everything the server sends until it closes, bounded by `limit`.
pub async fn read_all(stream: &mut TcpStream, limit: Duration) -> Vec<u8> {
    let mut out = Vec::new();
    let _ = tokio::time::timeout(limit, stream.read_to_end(&mut out)).await;
    out
}
