//! Keep-alive pooled transport.
//!
//! # Responsibilities
//! - Reuse established connections across every builder in the process
//! - Bound idle connections and expire them after the idle timeout
//! - Enforce dial and overall request deadlines
//!
//! # Design Decisions
//! - Backed by `reqwest`, which owns the connection pool and TLS
//! - Proxies come from the environment unless disabled in config
//! - `max_idle_connections` caps idle connections per host; reqwest has no
//!   process-wide idle cap

use futures_util::future::BoxFuture;
use futures_util::{StreamExt, TryStreamExt};

use crate::config::StandardTransportConfig;
use crate::transport::body::{ReaderChunks, RequestBody};
use crate::transport::error::{TransportError, TransportResult};
use crate::transport::{
    BufferedResponse, OutboundRequest, Transport, TransportKind, TransportResponse,
};

/// Transport over a single shared `reqwest` connection pool.
#[derive(Debug, Clone)]
pub struct StandardTransport {
    client: reqwest::Client,
    config: StandardTransportConfig,
}

impl StandardTransport {
    /// Build the transport and its connection pool.
    pub fn new(config: StandardTransportConfig) -> TransportResult<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.dial_timeout())
            .tcp_keepalive(config.keep_alive())
            .pool_max_idle_per_host(config.max_idle_connections)
            .pool_idle_timeout(config.idle_timeout())
            .timeout(config.request_timeout());
        if !config.use_env_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;

        tracing::info!(
            max_idle_connections = config.max_idle_connections,
            request_timeout_secs = config.request_timeout_secs,
            "Standard transport initialized"
        );

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &StandardTransportConfig {
        &self.config
    }

    fn build_request(&self, request: OutboundRequest) -> TransportResult<reqwest::Request> {
        let OutboundRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let builder = self.client.request(method, url).headers(headers);
        let builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Buffered(bytes) => builder.body(bytes),
            RequestBody::Stream(reader) => {
                builder.body(reqwest::Body::wrap_stream(ReaderChunks::new(reader)))
            }
        };
        Ok(builder.build()?)
    }
}

impl Transport for StandardTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Standard
    }

    fn execute(&self, request: OutboundRequest) -> BoxFuture<'_, TransportResult<TransportResponse>> {
        Box::pin(async move {
            let request = self.build_request(request)?;
            let response = self.client.execute(request).await?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes_stream().map_err(TransportError::from).boxed();

            Ok(TransportResponse {
                status,
                headers,
                body,
            })
        })
    }

    fn execute_buffered(
        &self,
        request: OutboundRequest,
    ) -> BoxFuture<'_, TransportResult<BufferedResponse>> {
        Box::pin(async move {
            let request = self.build_request(request)?;
            let response = self.client.execute(request).await?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;

            Ok(BufferedResponse {
                status,
                headers,
                body,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderValue, Method};
    use std::io::Cursor;
    use url::Url;

    fn transport() -> StandardTransport {
        StandardTransport::new(StandardTransportConfig {
            use_env_proxy: false,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn builds_request_with_headers_and_buffered_body() {
        let transport = transport();
        let mut request = OutboundRequest::new(Method::PUT, Url::parse("http://127.0.0.1:9/x").unwrap());
        request.headers.insert("x-user", HeaderValue::from_static("1"));
        request.body = RequestBody::Buffered(Bytes::from_static(b"payload"));

        let built = transport.build_request(request).unwrap();
        assert_eq!(built.method(), Method::PUT);
        assert_eq!(built.url().as_str(), "http://127.0.0.1:9/x");
        assert_eq!(built.headers()["x-user"], "1");
        assert_eq!(built.body().and_then(|b| b.as_bytes()), Some(&b"payload"[..]));
    }

    #[test]
    fn streamed_body_has_no_known_bytes() {
        let transport = transport();
        let mut request = OutboundRequest::new(Method::POST, Url::parse("http://127.0.0.1:9/").unwrap());
        request.body = RequestBody::Stream(Box::new(Cursor::new(b"streamed".to_vec())));

        let built = transport.build_request(request).unwrap();
        assert!(built.body().is_some());
        assert!(built.body().and_then(|b| b.as_bytes()).is_none());
    }

    #[tokio::test]
    async fn refused_connection_is_an_error_not_a_panic() {
        let transport = transport();
        // Port 9 (discard) is closed on loopback in test environments.
        let request = OutboundRequest::new(Method::GET, Url::parse("http://127.0.0.1:9/").unwrap());
        assert!(transport.execute_buffered(request).await.is_err());

        // The pool is still usable afterwards.
        let request = OutboundRequest::new(Method::GET, Url::parse("http://127.0.0.1:9/").unwrap());
        assert!(transport.execute(request).await.is_err());
    }
}
