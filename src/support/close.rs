//! Best-effort closing of async writers.

use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Flush and shut down `writer`, logging instead of returning any failure.
pub async fn close_quietly<W>(writer: &mut W, what: &str)
where
    W: AsyncWrite + Unpin + ?Sized,
{
    if let Err(e) = writer.shutdown().await {
        tracing::warn!(resource = what, error = %e, "Failed to close resource");
    }
}
