//! High-throughput pooled-object transport.
//!
//! # Responsibilities
//! - Reuse connections with a short idle expiry
//! - Cap concurrent connections per destination host
//! - Enforce separate write (send) and read (per body chunk) deadlines
//! - Collect buffered bodies into recycled buffers so a large body does not
//!   regrow a fresh buffer on every call
//!
//! # Design Decisions
//! - Built on the `hyper-util` legacy client with a rustls connector
//! - A per-host semaphore permit is held until the response body is finished,
//!   so a caller that stops reading keeps its slot until it drops the stream
//! - Response buffers are checked out and returned inside `execute_buffered`;
//!   callers only ever receive an owned copy, so each buffered response still
//!   costs one allocation of exactly the body size
//! - Per-destination limiters are swept once more than
//!   `LIMITER_SWEEP_THRESHOLD` destinations are tracked; a limiter nobody
//!   holds a permit on is dropped and rebuilt on next use

use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use futures_util::{stream, StreamExt, TryStreamExt};
use http::response::Parts;
use http::Request;
use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

use crate::config::PooledTransportConfig;
use crate::transport::body::{ReaderChunks, RequestBody, ResponseBody};
use crate::transport::error::{TimeoutPhase, TransportError, TransportResult};
use crate::transport::object_pool::ObjectPool;
use crate::transport::{
    BufferedResponse, OutboundRequest, Transport, TransportKind, TransportResponse,
};

/// Tracked destinations above which idle limiters are evicted.
const LIMITER_SWEEP_THRESHOLD: usize = 256;

type PooledBody = BoxBody<Bytes, io::Error>;
type PooledClient = Client<HttpsConnector<HttpConnector>, PooledBody>;

/// Transport with per-host connection caps and recycled response buffers.
#[derive(Debug)]
pub struct PooledTransport {
    client: PooledClient,
    config: PooledTransportConfig,
    limits: DashMap<String, Arc<Semaphore>>,
    buffers: ObjectPool<BytesMut>,
}

impl PooledTransport {
    /// Build the transport and its connection pool.
    pub fn new(config: PooledTransportConfig) -> Self {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_nodelay(true);
        http.set_connect_timeout(Some(config.dial_timeout()));
        http.set_keepalive(Some(config.keep_alive()));

        let https = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_all_versions()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.idle_timeout())
            .pool_max_idle_per_host(config.max_connections_per_host)
            .pool_timer(TokioTimer::new())
            .retry_canceled_requests(true)
            .build(https);

        let max_retained = config.max_retained_buffer_bytes;
        let buffers = ObjectPool::new(config.buffer_pool_capacity, BytesMut::new, move |buf: &mut BytesMut| {
            buf.clear();
            buf.capacity() <= max_retained
        });

        tracing::info!(
            max_connections_per_host = config.max_connections_per_host,
            read_timeout_ms = config.read_timeout_ms,
            write_timeout_ms = config.write_timeout_ms,
            "Pooled transport initialized"
        );

        Self {
            client,
            config,
            limits: DashMap::new(),
            buffers,
        }
    }

    pub fn config(&self) -> &PooledTransportConfig {
        &self.config
    }

    /// Idle response buffers ready for reuse.
    pub fn idle_buffers(&self) -> usize {
        self.buffers.idle()
    }

    /// Response buffers currently checked out.
    pub fn outstanding_buffers(&self) -> usize {
        self.buffers.outstanding()
    }

    /// Connection slots still free for `host:port`.
    pub fn available_permits(&self, destination: &str) -> usize {
        self.limits
            .get(destination)
            .map(|limit| limit.available_permits())
            .unwrap_or(self.config.max_connections_per_host)
    }

    /// Destinations that currently have a limiter.
    pub fn tracked_destinations(&self) -> usize {
        self.limits.len()
    }

    fn limiter(&self, destination: &str) -> Arc<Semaphore> {
        if self.limits.len() >= LIMITER_SWEEP_THRESHOLD && !self.limits.contains_key(destination) {
            // Permits and in-flight acquires hold a clone of the Arc.
            self.limits.retain(|_, limit| Arc::strong_count(limit) > 1);
        }
        self.limits
            .entry(destination.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.config.max_connections_per_host)))
            .clone()
    }

    /// Acquire a connection slot, send the request and wait for response headers.
    async fn send(
        &self,
        request: OutboundRequest,
    ) -> TransportResult<(Parts, Incoming, OwnedSemaphorePermit)> {
        let destination = destination(&request.url);
        let limiter = self.limiter(&destination);
        let request = into_hyper_request(request)?;
        let write_timeout = self.config.write_timeout();

        let exchange = async {
            let permit = limiter
                .acquire_owned()
                .await
                .map_err(|_| TransportError::LimiterClosed(destination.clone()))?;
            let response = self.client.request(request).await?;
            Ok::<_, TransportError>((response, permit))
        };

        let (response, permit) = tokio::time::timeout(write_timeout, exchange)
            .await
            .map_err(|_| TransportError::Timeout {
                phase: TimeoutPhase::Write,
                after: write_timeout,
            })??;

        let (parts, body) = response.into_parts();
        Ok((parts, body, permit))
    }
}

impl Transport for PooledTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Pooled
    }

    fn execute(&self, request: OutboundRequest) -> BoxFuture<'_, TransportResult<TransportResponse>> {
        Box::pin(async move {
            let (parts, body, permit) = self.send(request).await?;
            Ok(TransportResponse {
                status: parts.status,
                headers: parts.headers,
                body: body_stream(body, permit, self.config.read_timeout()),
            })
        })
    }

    fn execute_buffered(
        &self,
        request: OutboundRequest,
    ) -> BoxFuture<'_, TransportResult<BufferedResponse>> {
        Box::pin(async move {
            let (parts, mut body, _permit) = self.send(request).await?;
            let read_timeout = self.config.read_timeout();

            let mut buffer = self.buffers.checkout();
            while let Some(data) = next_data(&mut body, read_timeout).await? {
                buffer.extend_from_slice(&data);
            }
            let body = Bytes::copy_from_slice(&buffer);

            Ok(BufferedResponse {
                status: parts.status,
                headers: parts.headers,
                body,
            })
        })
    }
}

/// `host:port` key used for per-destination connection caps.
fn destination(url: &Url) -> String {
    format!(
        "{}:{}",
        url.host_str().unwrap_or_default(),
        url.port_or_known_default().unwrap_or_default()
    )
}

fn into_hyper_request(request: OutboundRequest) -> TransportResult<Request<PooledBody>> {
    let OutboundRequest {
        method,
        url,
        headers,
        body,
    } = request;

    let mut builder = Request::builder().method(method).uri(url.as_str());
    if let Some(target) = builder.headers_mut() {
        target.extend(headers);
    }
    builder
        .body(into_pooled_body(body))
        .map_err(|e| TransportError::InvalidRequest(e.to_string()))
}

fn into_pooled_body(body: RequestBody) -> PooledBody {
    match body {
        RequestBody::Empty => Empty::<Bytes>::new()
            .map_err(|never| -> io::Error { match never {} })
            .boxed(),
        RequestBody::Buffered(bytes) => Full::new(bytes)
            .map_err(|never| -> io::Error { match never {} })
            .boxed(),
        RequestBody::Stream(reader) => {
            BodyExt::boxed(StreamBody::new(ReaderChunks::new(reader).map_ok(Frame::data)))
        }
    }
}

/// Next data chunk of the body, skipping trailers. `None` at end of body.
async fn next_data(body: &mut Incoming, read_timeout: Duration) -> TransportResult<Option<Bytes>> {
    loop {
        let frame = match tokio::time::timeout(read_timeout, body.frame()).await {
            Err(_) => {
                return Err(TransportError::Timeout {
                    phase: TimeoutPhase::Read,
                    after: read_timeout,
                })
            }
            Ok(None) => return Ok(None),
            Ok(Some(frame)) => frame?,
        };
        if let Ok(data) = frame.into_data() {
            return Ok(Some(data));
        }
    }
}

/// Body stream that keeps the connection slot until it ends or is dropped.
fn body_stream(body: Incoming, permit: OwnedSemaphorePermit, read_timeout: Duration) -> ResponseBody {
    stream::try_unfold((body, permit), move |(mut body, permit)| async move {
        match next_data(&mut body, read_timeout).await? {
            Some(data) => Ok(Some((data, (body, permit)))),
            None => Ok(None),
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PooledTransportConfig {
        PooledTransportConfig {
            max_connections_per_host: 2,
            write_timeout_ms: 500,
            ..Default::default()
        }
    }

    #[test]
    fn destination_uses_known_default_ports() {
        assert_eq!(destination(&Url::parse("http://example.com/a").unwrap()), "example.com:80");
        assert_eq!(destination(&Url::parse("https://example.com/a").unwrap()), "example.com:443");
        assert_eq!(destination(&Url::parse("http://127.0.0.1:8000/").unwrap()), "127.0.0.1:8000");
    }

    #[test]
    fn hyper_request_carries_method_uri_and_headers() {
        let mut request = OutboundRequest::new(http::Method::PATCH, Url::parse("http://127.0.0.1:8000/p?q=1").unwrap());
        request.headers.insert("x-user", http::HeaderValue::from_static("3"));
        let built = into_hyper_request(request).unwrap();
        assert_eq!(built.method(), http::Method::PATCH);
        assert_eq!(built.uri(), "http://127.0.0.1:8000/p?q=1");
        assert_eq!(built.headers()["x-user"], "3");
    }

    #[tokio::test]
    async fn limiter_is_shared_per_destination() {
        let transport = PooledTransport::new(config());
        let first = transport.limiter("a:80");
        let again = transport.limiter("a:80");
        let other = transport.limiter("b:80");
        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));

        let _permit = first.clone().acquire_owned().await.unwrap();
        assert_eq!(transport.available_permits("a:80"), 1);
        assert_eq!(transport.available_permits("b:80"), 2);
        assert_eq!(transport.available_permits("never-used:80"), 2);
    }

    #[tokio::test]
    async fn idle_limiters_are_evicted_past_threshold() {
        let transport = PooledTransport::new(config());
        let busy = transport.limiter("busy:80");
        let _permit = busy.clone().acquire_owned().await.unwrap();
        drop(busy);

        for i in 0..LIMITER_SWEEP_THRESHOLD - 1 {
            transport.limiter(&format!("host-{i}:80"));
        }
        assert_eq!(transport.tracked_destinations(), LIMITER_SWEEP_THRESHOLD);

        transport.limiter("fresh:80");
        assert_eq!(transport.tracked_destinations(), 2);
        assert_eq!(transport.available_permits("busy:80"), 1);
        assert_eq!(transport.available_permits("host-0:80"), 2);
    }

    #[tokio::test]
    async fn refused_connection_releases_slot_and_buffer() {
        let transport = PooledTransport::new(config());
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let result = transport
            .execute_buffered(OutboundRequest::new(http::Method::GET, url))
            .await;
        assert!(result.is_err());
        assert_eq!(transport.available_permits("127.0.0.1:9"), 2);
        assert_eq!(transport.outstanding_buffers(), 0);
    }
}
