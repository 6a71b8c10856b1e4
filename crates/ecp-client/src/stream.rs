//! Streamed response bodies
//!
//! Both types wrap a response body and hand it out chunk by chunk; each
//! call suspends until the next chunk arrives or the stream ends. No
//! callbacks, no buffering of the whole body.

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{ClientError, Result};

/// The streamed enrichment result of a submitted job.
///
/// Distinguishes a clean end-of-stream from an abrupt disconnection:
/// [`ResultStream::chunk`] returns `Ok(None)` only when the body ended
/// normally, and [`ClientError::Interrupted`] when the connection was
/// cut mid-stream. [`ResultStream::is_complete`] reports the terminal
/// state after draining.
pub struct ResultStream {
    inner: BoxStream<'static, reqwest::Result<Bytes>>,
    complete: bool,
}

impl ResultStream {
    pub(crate) fn new(response: reqwest::Response) -> Self {
        Self {
            inner: response.bytes_stream().boxed(),
            complete: false,
        }
    }

    /// Next chunk of the result body, or `None` on a clean end.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>> {
        if self.complete {
            return Ok(None);
        }
        match self.inner.next().await {
            Some(Ok(bytes)) => Ok(Some(bytes)),
            Some(Err(err)) => Err(ClientError::Interrupted(err.to_string())),
            None => {
                self.complete = true;
                Ok(None)
            }
        }
    }

    /// Whether the stream ended normally.
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

impl std::fmt::Debug for ResultStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStream")
            .field("complete", &self.complete)
            .finish_non_exhaustive()
    }
}

/// A downloaded artifact's body.
pub struct ByteStream {
    inner: BoxStream<'static, reqwest::Result<Bytes>>,
}

impl ByteStream {
    pub(crate) fn new(response: reqwest::Response) -> Self {
        Self {
            inner: response.bytes_stream().boxed(),
        }
    }

    /// Next chunk of the artifact body, or `None` at the end.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>> {
        match self.inner.next().await {
            Some(chunk) => Ok(Some(chunk?)),
            None => Ok(None),
        }
    }

    /// Drain the stream into `writer`, returning the bytes written.
    pub async fn write_to<W>(&mut self, writer: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut written = 0u64;
        while let Some(chunk) = self.chunk().await? {
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        Ok(written)
    }
}

impl std::fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteStream").finish_non_exhaustive()
    }
}
