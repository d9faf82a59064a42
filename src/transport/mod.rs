//! Transport strategies behind the request builder.
//!
//! # Data Flow
//! ```text
//! RequestBuilder / Dispatcher
//!     → OutboundRequest (method, url, headers, body)
//!     → shared.rs (process-wide transport, built once)
//!     → standard.rs  (keep-alive connection pool)
//!       or pooled.rs (connection pool + per-host caps + pooled response buffers)
//!     → TransportResponse (status, headers, body stream)
//!       or BufferedResponse (status, headers, body bytes)
//! ```
//!
//! # Design Decisions
//! - One object-safe trait so callers never see which strategy they use
//! - Timeouts live in the transport; callers get no separate cancellation handle
//! - Pooled objects are checked out and returned inside a single call
//! - Tests inject their own `Transport` instead of touching the shared ones

pub mod body;
pub mod error;
pub mod object_pool;
pub mod pooled;
pub mod shared;
pub mod standard;

use bytes::{Bytes, BytesMut};
use futures_util::future::BoxFuture;
use futures_util::StreamExt;
use http::{HeaderMap, Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

pub use body::{BodyReader, ReaderChunks, RequestBody, ResponseBody};
pub use error::{TimeoutPhase, TransportError, TransportResult};
pub use object_pool::{ObjectPool, Pooled};
pub use pooled::PooledTransport;
pub use shared::{acquire_shared_transport, init_shared_transports};
pub use standard::StandardTransport;

/// A transport shared between any number of builders.
pub type SharedTransport = Arc<dyn Transport>;

/// Available transport strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Keep-alive connection pool with an overall request deadline.
    Standard,
    /// Connection pool with per-host caps, split read/write deadlines and pooled buffers.
    Pooled,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Standard => "standard",
            TransportKind::Pooled => "pooled",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown transport {0:?}, expected `standard` or `pooled`")]
pub struct UnknownTransport(String);

impl FromStr for TransportKind {
    type Err = UnknownTransport;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(TransportKind::Standard),
            "pooled" => Ok(TransportKind::Pooled),
            _ => Err(UnknownTransport(s.to_string())),
        }
    }
}

/// A fully prepared request handed to a transport.
#[derive(Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl OutboundRequest {
    /// Bare request with no headers and no body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }
}

/// Response whose body is still on the wire.
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Dropping the stream releases the underlying connection.
    pub body: ResponseBody,
}

impl TransportResponse {
    /// Read the remaining body into memory.
    pub async fn into_buffered(self) -> TransportResult<BufferedResponse> {
        let TransportResponse { status, headers, mut body } = self;
        let mut collected = BytesMut::new();
        while let Some(chunk) = body.next().await {
            collected.extend_from_slice(&chunk?);
        }
        Ok(BufferedResponse {
            status,
            headers,
            body: collected.freeze(),
        })
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Response with the whole body in memory.
#[derive(Debug, Clone)]
pub struct BufferedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A strategy for executing requests over pooled connections.
///
/// Implementations must be safe for unlimited concurrent callers and must
/// not be poisoned by a single failed request.
pub trait Transport: Send + Sync + fmt::Debug {
    fn kind(&self) -> TransportKind;

    /// Send the request and return once response headers arrive.
    fn execute(&self, request: OutboundRequest) -> BoxFuture<'_, TransportResult<TransportResponse>>;

    /// Send the request and read the whole response body.
    ///
    /// The connection is released before this returns, on success or failure.
    fn execute_buffered(
        &self,
        request: OutboundRequest,
    ) -> BoxFuture<'_, TransportResult<BufferedResponse>> {
        Box::pin(async move {
            let response = self.execute(request).await?;
            response.into_buffered().await
        })
    }
}
