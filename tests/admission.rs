//! Admission, hot reload, penalty and shutdown over real sockets.

use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use snare::config::ServerConfig;
use snare::protocols::redis;
use snare::Protocol;

mod common;

use common::{read_all, start_server, wait_for_active};

const DENIED: &[u8] = b"Access Denied\n";

/// Raw sessions that answer and then hold the socket until the client leaves.
fn holding_config(max_connections: usize) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.max_connections = max_connections;
    config.mock.protocol = Protocol::Raw;
    config.mock.never_complete = true;
    config
}

async fn connect_and_read_banner(addr: std::net::SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut banner = [0u8; 14];
    tokio::time::timeout(Duration::from_secs(5), stream.read_exact(&mut banner))
        .await
        .expect("banner timed out")
        .unwrap();
    assert_eq!(&banner, DENIED);
    stream
}

#[tokio::test]
async fn connections_past_capacity_are_closed_without_a_byte() {
    let server = start_server(holding_config(2)).await;

    let _first = connect_and_read_banner(server.addr).await;
    let _second = connect_and_read_banner(server.addr).await;
    wait_for_active(&server.tracker, 2).await;

    let mut third = TcpStream::connect(server.addr).await.unwrap();
    let bytes = read_all(&mut third, Duration::from_secs(2)).await;
    assert!(bytes.is_empty());
    assert_eq!(server.tracker.active_count(), 2);

    server.shutdown.trigger();
}

#[tokio::test]
async fn slot_is_reused_after_a_client_leaves() {
    let server = start_server(holding_config(1)).await;

    let first = connect_and_read_banner(server.addr).await;
    wait_for_active(&server.tracker, 1).await;

    drop(first);
    wait_for_active(&server.tracker, 0).await;

    let _again = connect_and_read_banner(server.addr).await;
    wait_for_active(&server.tracker, 1).await;

    server.shutdown.trigger();
}

#[tokio::test]
async fn reloaded_config_applies_to_new_sessions() {
    let mut config = ServerConfig::default();
    config.mock.protocol = Protocol::Raw;
    let server = start_server(config.clone()).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    assert_eq!(read_all(&mut stream, Duration::from_secs(2)).await, DENIED);

    config.mock.protocol = Protocol::Redis;
    server.updates.send(config).unwrap();

    let switched = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let mut stream = TcpStream::connect(server.addr).await.unwrap();
            let _ = stream.write_all(b"QUIT\r\n").await;
            let reply = read_all(&mut stream, Duration::from_secs(2)).await;
            if reply == redis::NOAUTH.as_bytes() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(switched.is_ok(), "redis behavior never took effect");

    server.shutdown.trigger();
}

#[tokio::test]
async fn shutdown_leaves_running_sessions_alone_by_default() {
    let server = start_server(holding_config(4)).await;

    let mut held = connect_and_read_banner(server.addr).await;
    wait_for_active(&server.tracker, 1).await;

    server.shutdown.trigger();
    server.handle.await.unwrap().unwrap();

    assert!(TcpStream::connect(server.addr).await.is_err());

    let mut buf = [0u8; 16];
    let still_open = tokio::time::timeout(Duration::from_millis(300), held.read(&mut buf)).await;
    assert!(still_open.is_err(), "held session was closed");
    assert_eq!(server.tracker.active_count(), 1);
}

#[tokio::test]
async fn shutdown_aborts_sessions_when_configured() {
    let mut config = holding_config(4);
    config.shutdown.abort_sessions = true;
    let server = start_server(config).await;

    let mut held = connect_and_read_banner(server.addr).await;
    wait_for_active(&server.tracker, 1).await;

    server.shutdown.trigger();

    let mut rest = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), held.read_to_end(&mut rest))
        .await
        .expect("aborted session stayed open")
        .unwrap();
    assert!(rest.is_empty());
    wait_for_active(&server.tracker, 0).await;
}

#[tokio::test]
async fn repeat_visitors_wait_longer() {
    let mut config = ServerConfig::default();
    config.mock.protocol = Protocol::Raw;
    config.mock.delay_ms = 300;
    config.penalty.enabled = true;
    config.penalty.window_secs = 60;
    let server = start_server(config).await;

    let mut elapsed = Vec::new();
    for _ in 0..2 {
        let started = Instant::now();
        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        let reply = read_all(&mut stream, Duration::from_secs(5)).await;
        assert_eq!(reply, DENIED);
        elapsed.push(started.elapsed());
    }

    assert!(elapsed[0] >= Duration::from_millis(300));
    assert!(elapsed[1] >= Duration::from_millis(600), "{:?}", elapsed);

    server.shutdown.trigger();
}
