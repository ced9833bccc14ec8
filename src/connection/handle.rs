//! Cloneable handle the registry stores for each live connection.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use super::{ConnectionBuilder, ConnectionId, PushError};

/// Shared state for [`ConnectionHandle`].
///
/// - `tx` – sending half of the outbound buffer; `None` once closed.
/// - `metadata` – auxiliary attributes captured at build time.
struct ConnectionInner {
    id: ConnectionId,
    user_id: String,
    role: String,
    metadata: HashMap<String, String>,
    capacity: usize,
    tx: Mutex<Option<mpsc::Sender<Bytes>>>,
}

/// Handle to a live connection's outbound buffer.
///
/// Clones share the same buffer and the same [`ConnectionId`]; two handles
/// refer to the same connection exactly when [`ConnectionHandle::same_connection`]
/// holds.
#[derive(Clone)]
pub struct ConnectionHandle(Arc<ConnectionInner>);

impl ConnectionHandle {
    /// Start building a connection for `user_id`.
    #[must_use]
    pub fn builder(user_id: impl Into<String>, role: impl Into<String>) -> ConnectionBuilder {
        ConnectionBuilder::new(user_id, role)
    }

    pub(crate) fn new(
        id: ConnectionId,
        user_id: String,
        role: String,
        metadata: HashMap<String, String>,
        capacity: usize,
        tx: mpsc::Sender<Bytes>,
    ) -> Self {
        Self(Arc::new(ConnectionInner {
            id,
            user_id,
            role,
            metadata,
            capacity,
            tx: Mutex::new(Some(tx)),
        }))
    }

    #[must_use]
    pub fn id(&self) -> ConnectionId { self.0.id }

    #[must_use]
    pub fn user_id(&self) -> &str { &self.0.user_id }

    #[must_use]
    pub fn role(&self) -> &str { &self.0.role }

    #[must_use]
    pub fn metadata(&self) -> &HashMap<String, String> { &self.0.metadata }

    /// Maximum number of frames the buffer holds.
    #[must_use]
    pub fn capacity(&self) -> usize { self.0.capacity }

    /// Whether both handles refer to the same built connection.
    #[must_use]
    pub fn same_connection(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }

    /// Enqueue a frame without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::Full`] if the buffer is at capacity and
    /// [`PushError::Closed`] if the handle was closed or the drain side has
    /// gone away.
    pub fn try_push(&self, frame: Bytes) -> Result<(), PushError> {
        let guard = self.0.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = guard.as_ref() else {
            return Err(PushError::Closed);
        };
        match tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(PushError::Full),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(PushError::Closed),
        }
    }

    /// Close the outbound buffer.
    ///
    /// Returns `true` for the call that closed it and `false` for every later
    /// call. Frames already queued remain readable by the drain side.
    pub fn close(&self) -> bool {
        let sender = self
            .0
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let closed = sender.is_some();
        if closed {
            debug!(user_id = %self.0.user_id, connection = %self.0.id, "outbound buffer closed");
        }
        closed
    }

    /// Whether the buffer no longer accepts frames.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.0
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_none_or(mpsc::Sender::is_closed)
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.0.id)
            .field("user_id", &self.0.user_id)
            .field("role", &self.0.role)
            .field("capacity", &self.0.capacity)
            .finish_non_exhaustive()
    }
}
