//! Builder for connection handles.

use std::collections::HashMap;

use tokio::sync::mpsc;

use super::{
    ConnectionConfigError,
    ConnectionHandle,
    ConnectionId,
    DEFAULT_BUFFER_CAPACITY,
    MAX_BUFFER_CAPACITY,
    Outbound,
};

/// Builder for a [`ConnectionHandle`] and its paired [`Outbound`] buffer.
///
/// The buffer holds [`DEFAULT_BUFFER_CAPACITY`] frames unless overridden.
/// Metadata is fixed once the handle is built.
///
/// # Examples
///
/// ```
/// use fanout::connection::ConnectionHandle;
///
/// let (handle, _outbound) = ConnectionHandle::builder("u1", "candidate")
///     .capacity(16)
///     .attribute("name", "Ada")
///     .build()
///     .expect("failed to build connection");
/// assert_eq!(handle.user_id(), "u1");
/// assert_eq!(handle.metadata().get("name").map(String::as_str), Some("Ada"));
/// ```
#[derive(Debug)]
pub struct ConnectionBuilder {
    user_id: String,
    role: String,
    capacity: usize,
    metadata: HashMap<String, String>,
}

impl ConnectionBuilder {
    pub(crate) fn new(user_id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: role.into(),
            capacity: DEFAULT_BUFFER_CAPACITY,
            metadata: HashMap::new(),
        }
    }

    /// Set how many frames may be pending before pushes are rejected.
    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Replace the auxiliary attributes stored with the connection.
    #[must_use]
    pub fn metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Add a single auxiliary attribute.
    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Build the handle and the drain side of its buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionConfigError::EmptyUserId`] if no user id was given
    /// and [`ConnectionConfigError::InvalidCapacity`] if the capacity is zero
    /// or exceeds [`MAX_BUFFER_CAPACITY`].
    pub fn build(self) -> Result<(ConnectionHandle, Outbound), ConnectionConfigError> {
        if self.user_id.is_empty() {
            return Err(ConnectionConfigError::EmptyUserId);
        }
        if self.capacity == 0 || self.capacity > MAX_BUFFER_CAPACITY {
            return Err(ConnectionConfigError::InvalidCapacity(self.capacity));
        }
        let id = ConnectionId::allocate();
        let (tx, rx) = mpsc::channel(self.capacity);
        let outbound = Outbound::new(id, self.user_id.clone(), rx);
        let handle = ConnectionHandle::new(
            id,
            self.user_id,
            self.role,
            self.metadata,
            self.capacity,
            tx,
        );
        Ok((handle, outbound))
    }
}
