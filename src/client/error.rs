use std::io;
use thiserror::Error;

use crate::client::multipart::MultipartError;
use crate::transport::TransportError;

/// Failure surfaced by a builder terminal call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Request construction failed earlier; repeated on every later dispatch.
    #[error("request construction failed: {0}")]
    Build(#[from] MultipartError),

    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to write response body: {0}")]
    Sink(#[from] io::Error),
}

impl ClientError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Transport(e) if e.is_timeout())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
