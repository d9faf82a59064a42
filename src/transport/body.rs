//! Request and response body plumbing shared by both transports.

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::Stream;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

use crate::transport::error::TransportError;

/// Chunk size used when turning a reader into a body stream.
pub const CHUNK_SIZE: usize = 16 * 1024;

/// Source of a streamed request body of unknown length.
pub type BodyReader = Box<dyn AsyncRead + Send + Sync + Unpin>;

/// Response body as a stream of chunks.
pub type ResponseBody = BoxStream<'static, Result<Bytes, TransportError>>;

/// Body of an outbound request. Exactly one shape is active at a time.
#[derive(Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Fully materialized in memory.
    Buffered(Bytes),
    /// Read incrementally while the request is sent.
    Stream(BodyReader),
}

impl RequestBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            RequestBody::Buffered(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Produce the body to send for one dispatch.
    ///
    /// Buffered bodies stay in place and can be sent again; a stream can only
    /// be read once, so it is moved out and `self` becomes empty.
    pub fn take_for_dispatch(&mut self) -> RequestBody {
        match self {
            RequestBody::Empty => RequestBody::Empty,
            RequestBody::Buffered(bytes) => RequestBody::Buffered(bytes.clone()),
            RequestBody::Stream(_) => std::mem::take(self),
        }
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => write!(f, "Empty"),
            RequestBody::Buffered(bytes) => write!(f, "Buffered({} bytes)", bytes.len()),
            RequestBody::Stream(_) => write!(f, "Stream"),
        }
    }
}

/// Adapts a [`BodyReader`] into a stream of owned chunks.
pub struct ReaderChunks {
    reader: Option<BodyReader>,
    buf: Box<[u8]>,
}

impl ReaderChunks {
    pub fn new(reader: BodyReader) -> Self {
        Self {
            reader: Some(reader),
            buf: vec![0u8; CHUNK_SIZE].into_boxed_slice(),
        }
    }
}

impl Stream for ReaderChunks {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(reader) = this.reader.as_mut() else {
            return Poll::Ready(None);
        };

        let mut read_buf = ReadBuf::new(&mut this.buf);
        match Pin::new(reader).poll_read(cx, &mut read_buf) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(e)) => {
                this.reader = None;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(Ok(())) => {
                let filled = read_buf.filled();
                if filled.is_empty() {
                    this.reader = None;
                    Poll::Ready(None)
                } else {
                    Poll::Ready(Some(Ok(Bytes::copy_from_slice(filled))))
                }
            }
        }
    }
}
