//! Shared utilities for integration tests.
//!
//! Mock backends speak just enough HTTP/1.1 over raw sockets to answer one
//! request per connection.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue};
use inference_gateway::config::{GatewayConfig, RouteConfig, Scheme};
use inference_gateway::{GatewayServer, Shutdown, StaticHeaders};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl SeenRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Read one request (head plus `Content-Length` body) from `socket`.
pub async fn read_request(socket: &mut TcpStream) -> Option<SeenRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(SeenRequest { method, path, headers, body })
}

async fn write_response(socket: &mut TcpStream, extra_headers: &[(&str, &str)], body: &[u8]) {
    let mut head = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n", body.len());
    for (name, value) in extra_headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");

    let _ = socket.write_all(head.as_bytes()).await;
    let _ = socket.write_all(body).await;
    let _ = socket.shutdown().await;
}

/// Backend answering `<METHOD> <PATH>\n<BODY>` after `delay`.
///
/// Response carries `x-backend: echo` and `access-control-allow-origin:
/// backend`. The returned counter tracks the largest number of requests it
/// ever handled at the same time.
pub async fn start_echo_backend(delay: Duration) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let peak_out = peak.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);

                tokio::time::sleep(delay).await;

                let mut body = format!("{} {}\n", request.method, request.path).into_bytes();
                body.extend_from_slice(&request.body);
                in_flight.fetch_sub(1, Ordering::SeqCst);

                write_response(
                    &mut socket,
                    &[("x-backend", "echo"), ("access-control-allow-origin", "backend")],
                    &body,
                )
                .await;
            });
        }
    });

    (addr, peak_out)
}

/// Backend that logs `start <PATH>` on receipt and `end <PATH>` just before
/// answering, taking `delay` in between.
pub async fn start_recording_backend(delay: Duration) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_out = events.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let events = events.clone();
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                events.lock().unwrap().push(format!("start {}", request.path));
                tokio::time::sleep(delay).await;
                events.lock().unwrap().push(format!("end {}", request.path));
                write_response(&mut socket, &[], request.path.as_bytes()).await;
            });
        }
    });

    (addr, events_out)
}

/// Send a `GET` for `path` exactly as written over a fresh socket, without
/// reading the answer.
pub async fn send_raw_get(gateway: SocketAddr, path: &str) -> TcpStream {
    let mut socket = TcpStream::connect(gateway).await.unwrap();
    let request = format!("GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n", path, gateway);
    socket.write_all(request.as_bytes()).await.unwrap();
    socket
}

/// Read until the gateway closes the connection.
pub async fn read_raw_response(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(5), socket.read_to_end(&mut buf)).await;
    String::from_utf8_lossy(&buf).to_string()
}

/// Backend that accepts and reads the request, then never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = read_request(&mut socket).await;
                tokio::time::sleep(Duration::from_secs(3600)).await;
            });
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn route(name: &str, prefix: &str, strip: Option<&str>, backend: SocketAddr) -> RouteConfig {
    RouteConfig {
        name: name.into(),
        prefix: prefix.into(),
        strip_prefix: strip.map(Into::into),
        host: backend.ip().to_string(),
        port: backend.port(),
        scheme: Scheme::Http,
        rewrite_host: false,
    }
}

pub fn config(routes: Vec<RouteConfig>, job_timeout_secs: u64) -> GatewayConfig {
    let mut config = GatewayConfig {
        routes,
        ..GatewayConfig::default()
    };
    config.queue.job_timeout_secs = job_timeout_secs;
    config
}

pub fn cors_headers() -> StaticHeaders {
    StaticHeaders::new(vec![
        (
            HeaderName::from_static("access-control-allow-origin"),
            HeaderValue::from_static("*"),
        ),
        (
            HeaderName::from_static("cross-origin-opener-policy"),
            HeaderValue::from_static("same-origin"),
        ),
    ])
}

/// Start the gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig, headers: StaticHeaders) -> (SocketAddr, Shutdown) {
    let shutdown = Shutdown::new();
    let server = GatewayServer::new(&config, headers, &shutdown).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
