//! Clients that misbehave: vanish mid-session, send garbage, stall.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use snare::config::ServerConfig;
use snare::session::{handle_connection, MockConfig, SessionEnd};
use snare::timing::RandomSource;
use snare::Protocol;

mod common;

use common::{captured, read_all, start_server, wait_for_active, MockStream};

fn server_config(protocol: Protocol, tarpit: bool) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.mock.protocol = protocol;
    config.mock.tarpit = tarpit;
    config
}

#[tokio::test]
async fn vanishing_clients_release_every_session() {
    for protocol in Protocol::ALL {
        for tarpit in [false, true] {
            let server = start_server(server_config(protocol, tarpit)).await;

            let mut clients = Vec::new();
            for _ in 0..3 {
                clients.push(TcpStream::connect(server.addr).await.unwrap());
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
            drop(clients);

            // Handlers that only write notice the peer on their next write,
            // which a tarpit may schedule up to a drip interval later.
            tokio::time::timeout(Duration::from_secs(10), async {
                while server.tracker.active_count() > 0 {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
            })
            .await
            .unwrap_or_else(|_| panic!("{} tarpit={} leaked sessions", protocol, tarpit));

            server.shutdown.trigger();
        }
    }
}

#[tokio::test]
async fn garbage_input_never_crashes_a_session() {
    let garbage: Vec<u8> = (0..=255u8).cycle().take(4096).collect();

    for protocol in Protocol::ALL {
        let server = start_server(server_config(protocol, false)).await;

        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        let _ = stream.write_all(&garbage).await;
        let _ = stream.shutdown().await;
        let _ = read_all(&mut stream, Duration::from_secs(3)).await;
        drop(stream);

        wait_for_active(&server.tracker, 0).await;
        assert!(!server.handle.is_finished(), "{} stopped accepting", protocol);

        server.shutdown.trigger();
    }
}

#[tokio::test(start_paused = true)]
async fn silent_peer_hits_the_read_deadline() {
    // The far end stays open but never speaks.
    let (server_end, _client_end) = tokio::io::duplex(1024);
    let mut config = MockConfig::new(Protocol::Redis);
    config.rng = RandomSource::seeded(11);

    let end = handle_connection(server_end, config).await;
    assert_eq!(end, SessionEnd::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn tarpit_writes_to_a_dead_peer_end_the_session() {
    let (stream, output) = MockStream::sink(10);
    let mut config = MockConfig::new(Protocol::Telnet);
    config.tarpit = true;
    config.rng = RandomSource::seeded(12);

    assert_eq!(handle_connection(stream, config).await, SessionEnd::Disconnected);
    assert_eq!(captured(&output).len(), 10);
}
