//! Per-connection state shared between the registry and a drain loop.
//!
//! A [`ConnectionHandle`] pairs a user identity with the sending half of a
//! bounded outbound buffer. The receiving half, [`Outbound`], is handed to the
//! collaborator that owns the transport; it drains frames in FIFO order and
//! writes them out, typically through an [`OutboundWriter`].
//!
//! Producers never wait on a slow consumer: [`ConnectionHandle::try_push`]
//! either enqueues immediately or reports [`PushError::Full`].

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use bytes::Bytes;
use static_assertions::const_assert;
use tokio::sync::mpsc;

mod builder;
mod errors;
mod handle;
pub mod writer;

pub use builder::ConnectionBuilder;
pub use errors::{ConnectionConfigError, PushError};
pub use handle::ConnectionHandle;
pub use writer::{LineTransport, OutboundWriter, Transport};

/// Number of pending frames a connection buffers unless configured otherwise.
pub const DEFAULT_BUFFER_CAPACITY: usize = 256;
/// Largest outbound buffer a single connection may reserve.
pub const MAX_BUFFER_CAPACITY: usize = 65_536;

const_assert!(DEFAULT_BUFFER_CAPACITY <= MAX_BUFFER_CAPACITY);

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier assigned to each built connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl From<u64> for ConnectionId {
    fn from(value: u64) -> Self { Self(value) }
}

impl ConnectionId {
    /// Create a new [`ConnectionId`] with the provided value.
    #[must_use]
    pub fn new(id: u64) -> Self { Self(id) }

    /// Allocate the next unused identifier.
    pub(crate) fn allocate() -> Self { Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)) }

    /// Return the inner `u64` representation.
    #[must_use]
    pub fn as_u64(&self) -> u64 { self.0 }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "conn-{}", self.0) }
}

/// Receiving half of a connection's outbound buffer.
///
/// Owned by whoever drives the transport. Once every frame queued before the
/// handle was closed has been received, [`Outbound::recv`] returns `None`.
#[derive(Debug)]
pub struct Outbound {
    id: ConnectionId,
    user_id: String,
    rx: mpsc::Receiver<Bytes>,
}

impl Outbound {
    pub(crate) fn new(id: ConnectionId, user_id: String, rx: mpsc::Receiver<Bytes>) -> Self {
        Self { id, user_id, rx }
    }

    /// Identifier of the connection this buffer belongs to.
    #[must_use]
    pub fn id(&self) -> ConnectionId { self.id }

    /// User the buffered frames are addressed to.
    #[must_use]
    pub fn user_id(&self) -> &str { &self.user_id }

    /// Wait for the next frame.
    ///
    /// Returns `None` once the buffer is closed and empty.
    pub async fn recv(&mut self) -> Option<Bytes> { self.rx.recv().await }

    /// Take the next frame if one is already queued.
    pub fn try_recv(&mut self) -> Option<Bytes> { self.rx.try_recv().ok() }

    /// Stop accepting frames from the drain side.
    ///
    /// Frames already queued can still be received. Later pushes through the
    /// handle fail with [`PushError::Closed`].
    pub fn close(&mut self) { self.rx.close(); }

    /// Number of frames waiting to be drained.
    #[must_use]
    pub fn len(&self) -> usize { self.rx.len() }

    /// Whether no frames are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.rx.is_empty() }
}
