//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use limeload::load_balancer::{AlgorithmKind, ServerRecord, ServerPool};

/// Start a mock health backend that always answers `200 OK`.
/// Returns the bound port.
pub async fn start_mock_backend() -> u16 {
    start_programmable_backend(|| async { 200 }).await
}

/// Start a mock health backend whose status code is chosen per request.
pub async fn start_programmable_backend<F, Fut>(f: F) -> u16
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = u16> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let status_text = match f().await {
                    200 => "200 OK",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    status_text
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    port
}

/// Mock backend that answers with whatever status is currently stored.
pub async fn start_switchable_backend() -> (u16, Arc<AtomicU16>) {
    let status = Arc::new(AtomicU16::new(200));
    let handle = status.clone();
    let port = start_programmable_backend(move || {
        let status = handle.clone();
        async move { status.load(Ordering::SeqCst) }
    })
    .await;
    (port, status)
}

/// A port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

pub fn server(id: &str, address: &str, port: u16) -> ServerRecord {
    ServerRecord::new(id, address, port).unwrap()
}

/// Round-robin pool holding `s1..=sN` on 127.0.0.1.
pub fn pool_of(n: usize) -> Arc<ServerPool> {
    let pool = Arc::new(ServerPool::new(AlgorithmKind::RoundRobin));
    for i in 1..=n {
        pool.add_server(server(&format!("s{}", i), "127.0.0.1", 9000 + i as u16)).unwrap();
    }
    pool
}

pub fn ids(servers: &[ServerRecord]) -> Vec<String> {
    servers.iter().map(|s| s.id().to_string()).collect()
}

/// Poll `condition` every 10ms until it holds or `deadline` passes.
pub async fn eventually<F: Fn() -> bool>(deadline: Duration, condition: F) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
