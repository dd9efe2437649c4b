//! Load testing for the accept loop.

use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use snare::config::ServerConfig;
use snare::protocols::redis;
use snare::Protocol;

mod common;

use common::{read_all, start_server, wait_for_active};

#[tokio::test]
async fn test_concurrent_sessions() {
    let mut config = ServerConfig::default();
    config.listener.max_connections = 1000;
    config.mock.protocol = Protocol::Redis;
    let server = start_server(config).await;

    let concurrency = 20;
    let sessions_per_task = 25;
    let total = concurrency * sessions_per_task;
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let addr = server.addr;
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            for _ in 0..sessions_per_task {
                let session_start = Instant::now();
                let Ok(mut stream) = TcpStream::connect(addr).await else {
                    continue;
                };
                if stream.write_all(b"PING\r\nQUIT\r\n").await.is_err() {
                    continue;
                }
                let reply = read_all(&mut stream, Duration::from_secs(5)).await;
                if reply.starts_with(redis::NOAUTH.as_bytes()) {
                    latencies.push(session_start.elapsed());
                }
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for task in tasks {
        all_latencies.extend(task.await.unwrap());
    }
    let duration = start.elapsed();

    if all_latencies.is_empty() {
        panic!("No session completed");
    }

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Sessions:       {}", total);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Sessions/sec:   {:.2}", total as f64 / duration.as_secs_f64());
    println!("P50 Latency:    {:?}", p50);
    println!("P99 Latency:    {:?}", p99);
    println!("Success Rate:   {}/{}", all_latencies.len(), total);
    println!("-------------------------\n");

    assert_eq!(all_latencies.len(), total);
    wait_for_active(&server.tracker, 0).await;
    server.shutdown.trigger();
}

#[tokio::test]
async fn test_held_sessions_do_not_block_admission_below_capacity() {
    let mut config = ServerConfig::default();
    config.listener.max_connections = 64;
    config.mock.protocol = Protocol::Raw;
    config.mock.never_complete = true;
    let server = start_server(config).await;

    let mut held = Vec::new();
    for _ in 0..64 {
        held.push(TcpStream::connect(server.addr).await.unwrap());
    }
    wait_for_active(&server.tracker, 64).await;

    let mut refused = TcpStream::connect(server.addr).await.unwrap();
    assert!(read_all(&mut refused, Duration::from_secs(2)).await.is_empty());

    held.truncate(32);
    wait_for_active(&server.tracker, 32).await;

    let mut admitted = TcpStream::connect(server.addr).await.unwrap();
    let reply = read_all(&mut admitted, Duration::from_millis(500)).await;
    assert_eq!(reply, b"Access Denied\n");

    server.shutdown.trigger();
}
