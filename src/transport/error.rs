//! Transport-level error definitions.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Which leg of an exchange ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPhase {
    /// Acquiring a connection and sending the request, up to response headers.
    Write,
    /// Waiting for the next chunk of the response body.
    Read,
}

impl fmt::Display for TimeoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutPhase::Write => write!(f, "write"),
            TimeoutPhase::Read => write!(f, "read"),
        }
    }
}

/// Errors surfaced by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The keep-alive transport failed to connect, send or receive.
    #[error("request failed: {0}")]
    Standard(#[from] reqwest::Error),

    /// The pooled-object transport failed to connect or send.
    #[error("request failed: {0}")]
    Pooled(#[from] hyper_util::client::legacy::Error),

    /// Reading the response body failed mid-stream.
    #[error("response body read failed: {0}")]
    Body(#[from] hyper::Error),

    /// Reading a streamed request body failed.
    #[error("request body read failed: {0}")]
    Io(#[from] std::io::Error),

    /// A configured deadline expired.
    #[error("{phase} timed out after {after:?}")]
    Timeout { phase: TimeoutPhase, after: Duration },

    /// The request could not be turned into a wire request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The per-destination connection limiter was shut down.
    #[error("connection limiter for {0} is closed")]
    LimiterClosed(String),
}

impl TransportError {
    /// Whether the failure was a deadline rather than a connection problem.
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Timeout { .. } => true,
            TransportError::Standard(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
