//! Drain loop moving buffered frames onto a transport.
//!
//! The writer polls a shutdown token and the connection's [`Outbound`]
//! buffer using a `tokio::select!` loop. The `biased` keyword ensures a
//! shutdown request is noticed before the next frame is written; frames
//! already queued are still flushed before the transport is closed.

use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::Outbound;

/// Destination for serialized frames of a single connection.
#[async_trait]
pub trait Transport: Send {
    /// Write one frame.
    async fn send(&mut self, frame: Bytes) -> io::Result<()>;

    /// Release the transport once no more frames will be written.
    async fn close(&mut self) -> io::Result<()> { Ok(()) }
}

/// Newline-delimited framing over any [`AsyncWrite`].
#[derive(Debug)]
pub struct LineTransport<W> {
    inner: W,
}

impl<W> LineTransport<W> {
    /// Wrap `inner`.
    pub fn new(inner: W) -> Self { Self { inner } }

    /// Recover the wrapped writer.
    pub fn into_inner(self) -> W { self.inner }
}

#[async_trait]
impl<W> Transport for LineTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, frame: Bytes) -> io::Result<()> {
        self.inner.write_all(&frame).await?;
        self.inner.write_all(b"\n").await?;
        self.inner.flush().await
    }

    async fn close(&mut self) -> io::Result<()> { self.inner.shutdown().await }
}

/// Drives frames from an [`Outbound`] buffer to a [`Transport`].
pub struct OutboundWriter<T> {
    outbound: Outbound,
    transport: T,
    shutdown: CancellationToken,
}

impl<T: Transport> OutboundWriter<T> {
    /// Create a writer for the given buffer and transport.
    #[must_use]
    pub fn new(outbound: Outbound, transport: T, shutdown: CancellationToken) -> Self {
        Self {
            outbound,
            transport,
            shutdown,
        }
    }

    /// Write frames until the buffer is closed and drained.
    ///
    /// Returns the number of frames written. The transport is closed once the
    /// buffer is exhausted, whether that was caused by the handle being closed
    /// or by `shutdown` firing.
    ///
    /// # Errors
    ///
    /// Returns the first transport error. The buffer is dropped with the
    /// writer, so later pushes to the connection report
    /// [`PushError::Closed`](super::PushError::Closed).
    pub async fn run(mut self) -> io::Result<usize> {
        let mut written = 0usize;
        let mut shutting_down = false;
        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled(), if !shutting_down => {
                    shutting_down = true;
                    self.outbound.close();
                }

                frame = self.outbound.recv() => match frame {
                    Some(frame) => {
                        if let Err(e) = self.transport.send(frame).await {
                            warn!(
                                user_id = %self.outbound.user_id(),
                                connection = %self.outbound.id(),
                                error = %e,
                                "transport write failed"
                            );
                            return Err(e);
                        }
                        written += 1;
                    }
                    None => break,
                },
            }
        }
        debug!(
            user_id = %self.outbound.user_id(),
            connection = %self.outbound.id(),
            written,
            "outbound buffer drained"
        );
        self.transport.close().await?;
        Ok(written)
    }
}
