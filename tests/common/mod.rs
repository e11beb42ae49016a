//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use origin_relay::config::RelayConfig;
use origin_relay::http::HttpServer;
use origin_relay::lifecycle::Shutdown;
use origin_relay::observability::metrics::InFlightCounter;

/// Canned origin response.
#[derive(Clone)]
pub struct MockResponse {
    pub status: &'static str,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl MockResponse {
    pub fn ok(content_type: Option<&'static str>, body: Vec<u8>) -> Self {
        let mut headers = Vec::new();
        if let Some(ct) = content_type {
            headers.push(("Content-Type", ct.to_string()));
        }
        Self {
            status: "200 OK",
            headers,
            body,
        }
    }

    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }

    pub fn status(mut self, status: &'static str) -> Self {
        self.status = status;
        self
    }
}

/// Request heads seen by a mock origin, lower-cased.
pub type SeenRequests = Arc<Mutex<Vec<String>>>;

async fn read_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).to_lowercase()
}

/// Start a mock origin that answers every request with `response`.
pub async fn start_mock_origin(addr: SocketAddr, response: MockResponse) -> SeenRequests {
    let listener = TcpListener::bind(addr).await.unwrap();
    let seen: SeenRequests = Arc::default();
    let recorder = seen.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let response = response.clone();
            let recorder = recorder.clone();
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                recorder.lock().unwrap().push(head);

                let mut out = format!("HTTP/1.1 {}\r\n", response.status);
                for (name, value) in &response.headers {
                    out.push_str(&format!("{name}: {value}\r\n"));
                }
                out.push_str(&format!(
                    "Content-Length: {}\r\nConnection: close\r\n\r\n",
                    response.body.len()
                ));

                let _ = socket.write_all(out.as_bytes()).await;
                let _ = socket.write_all(&response.body).await;
                let _ = socket.shutdown().await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            });
        }
    });

    seen
}

/// Start a mock origin that advertises a large PNG, sends it in slow
/// chunks and never finishes.
pub async fn start_trickling_origin(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = read_head(&mut socket).await;
                let head = "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: 104857600\r\nConnection: close\r\n\r\n";
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                let chunk = vec![0x5au8; 16 * 1024];
                loop {
                    if socket.write_all(&chunk).await.is_err() {
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
            });
        }
    });
}

/// Start a mock origin that sends part of the body, then resets the
/// connection.
pub async fn start_truncating_origin(addr: SocketAddr, sent: usize) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = read_head(&mut socket).await;
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    sent * 4
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&vec![1u8; sent]).await;
                let _ = socket.flush().await;
                tokio::time::sleep(Duration::from_millis(50)).await;
                drop(socket);
            });
        }
    });
}

/// Run a relay on `addr` and return its shutdown handle and in-flight
/// counter.
pub async fn start_relay(addr: SocketAddr, mut config: RelayConfig) -> (Shutdown, InFlightCounter) {
    config.listener.bind_address = addr.to_string();

    let shutdown = Shutdown::new();
    let (_, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let in_flight = server.relay().in_flight.clone();
    let listener = TcpListener::bind(addr).await.unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    (shutdown, in_flight)
}

/// Client that never pools or proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Poll until the in-flight counter drops to zero.
#[allow(dead_code)]
pub async fn wait_idle(in_flight: &InFlightCounter) -> bool {
    for _ in 0..100 {
        if in_flight.current() == 0 {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
