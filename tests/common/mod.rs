//! Shared backends and transports for integration tests.

#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::extract::Path;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use futures_util::future::BoxFuture;
use futures_util::{stream, StreamExt};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use courier::config::{PooledTransportConfig, StandardTransportConfig};
use courier::transport::{
    OutboundRequest, PooledTransport, SharedTransport, StandardTransport, Transport, TransportKind,
    TransportResponse, TransportResult,
};

/// Start a raw backend that answers every request with a fixed response.
pub async fn start_canned_backend(content_type: &'static str, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut head = Vec::new();
                        let mut buf = [0u8; 1024];
                        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => head.extend_from_slice(&buf[..n]),
                            }
                        }
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            content_type,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start an axum backend that reflects requests back to the caller.
///
/// - `GET /get` returns `{"ok":true}`
/// - `/echo` returns the request body, with method, content type, cookie
///   and user agent mirrored into `x-echo-*` headers
/// - `GET /tag/{name}` returns `name` in body and `x-tag` header
/// - `GET /stream` returns a chunked body of five parts
/// - `GET /slow-body` sends headers at once and the body after one second
pub async fn start_echo_backend() -> SocketAddr {
    let app = Router::new()
        .route("/get", get(|| async { ([("content-type", "application/json")], "{\"ok\":true}") }))
        .route("/echo", any(echo))
        .route("/tag/{name}", get(tag))
        .route("/stream", get(chunked))
        .route("/slow-body", get(slow_body));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Response {
    let mut response = (StatusCode::OK, body).into_response();
    let reflected = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(method.as_str()) {
        reflected.insert("x-echo-method", value);
    }
    for (from, to) in [
        ("content-type", "x-echo-content-type"),
        ("cookie", "x-echo-cookie"),
        ("user-agent", "x-echo-user-agent"),
        ("x-request-id", "x-echo-request-id"),
    ] {
        if let Some(value) = headers.get(from) {
            reflected.insert(to, value.clone());
        }
    }
    response
}

async fn tag(Path(name): Path<String>) -> Response {
    let mut response = name.clone().into_response();
    if let Ok(value) = HeaderValue::from_str(&name) {
        response.headers_mut().insert("x-tag", value);
    }
    response
}

async fn chunked() -> Response {
    let chunks = stream::iter((0..5).map(|i| Ok::<_, Infallible>(Bytes::from(format!("chunk-{i};")))));
    Body::from_stream(chunks).into_response()
}

async fn slow_body() -> Response {
    let delayed = stream::once(async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok::<_, Infallible>(Bytes::from_static(b"late"))
    });
    Body::from_stream(delayed).into_response()
}

pub fn standard_transport() -> Arc<StandardTransport> {
    let config = StandardTransportConfig {
        use_env_proxy: false,
        ..StandardTransportConfig::default()
    };
    Arc::new(StandardTransport::new(config).unwrap())
}

pub fn pooled_transport(config: PooledTransportConfig) -> Arc<PooledTransport> {
    Arc::new(PooledTransport::new(config))
}

/// One fresh instance of each strategy.
pub fn both_transports() -> Vec<SharedTransport> {
    vec![
        standard_transport() as SharedTransport,
        pooled_transport(PooledTransportConfig::default()) as SharedTransport,
    ]
}

/// Counts calls and never touches the network.
#[derive(Debug, Default)]
pub struct CountingTransport {
    calls: AtomicUsize,
}

impl CountingTransport {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for CountingTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Standard
    }

    fn execute(&self, _request: OutboundRequest) -> BoxFuture<'_, TransportResult<TransportResponse>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async {
            Ok(TransportResponse {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: stream::empty().boxed(),
            })
        })
    }
}

/// A file in the temp dir, removed on drop.
pub struct TempFile {
    pub path: PathBuf,
}

impl TempFile {
    pub async fn with_contents(contents: &[u8]) -> Self {
        let path = std::env::temp_dir().join(format!("courier-{}.bin", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, contents).await.unwrap();
        Self { path }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
