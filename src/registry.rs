//! Registry of live connections keyed by user id.
//!
//! `Registry` maps each user to at most one [`ConnectionHandle`]. Structural
//! changes are atomic per user: registering replaces and closes any previous
//! handle, and unregistering only removes the entry if it still belongs to the
//! handle being unregistered, so a late teardown of an old connection can
//! never evict its replacement.
//!
//! Delivery is best effort. [`Registry::send_to_user`] never waits: the frame
//! is either placed on the recipient's buffer immediately or dropped, and the
//! result is reported as a [`SendOutcome`] rather than an error.
use dashmap::{DashMap, mapref::entry::Entry};
use tracing::{debug, error, info, warn};

use crate::{
    config::{OverflowPolicy, RegistryConfig},
    connection::{ConnectionHandle, PushError},
    message::Message,
    metrics::{self, DropLabel, EvictionCause},
};

/// Result of attempting to deliver a message.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// The frame was placed on the recipient's buffer.
    Delivered,
    /// No connection is registered for the recipient.
    NotConnected,
    /// The recipient is registered but the frame was discarded.
    Dropped(DropReason),
}

impl SendOutcome {
    #[must_use]
    pub fn is_delivered(self) -> bool { matches!(self, Self::Delivered) }
}

/// Why a message to a registered user was discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// The recipient's buffer was at capacity.
    BufferFull,
    /// The recipient's buffer had been closed.
    BufferClosed,
    /// The message could not be serialized.
    Encode,
}

/// Concurrent registry of connection handles keyed by user id.
#[derive(Debug, Default)]
pub struct Registry {
    connections: DashMap<String, ConnectionHandle>,
    overflow: OverflowPolicy,
}

impl Registry {
    /// Create an empty registry using the overflow policy from `config`.
    #[must_use]
    pub fn new(config: &RegistryConfig) -> Self { Self::with_policy(config.overflow) }

    /// Create an empty registry with the given overflow policy.
    #[must_use]
    pub fn with_policy(overflow: OverflowPolicy) -> Self {
        Self {
            connections: DashMap::new(),
            overflow,
        }
    }

    #[must_use]
    pub fn overflow(&self) -> OverflowPolicy { self.overflow }

    /// Register `handle` as the live connection for its user.
    ///
    /// A handle already registered for the same user is replaced and its
    /// buffer closed. Registering the current handle again is a no-op.
    ///
    /// A handle whose buffer is already closed is ignored and `false` is
    /// returned, leaving any live connection for the user in place.
    pub fn register(&self, handle: ConnectionHandle) -> bool {
        let user_id = handle.user_id();
        let connection = handle.id();
        let entry = self.connections.entry(user_id.to_owned());
        if handle.is_closed() {
            drop(entry);
            debug!(user_id, %connection, "ignoring register for closed connection");
            return false;
        }
        let previous = match entry {
            Entry::Occupied(mut occupied) => Some(occupied.insert(handle.clone())),
            Entry::Vacant(vacant) => {
                vacant.insert(handle.clone());
                None
            }
        };
        match previous {
            Some(old) if !old.same_connection(&handle) => {
                old.close();
                metrics::inc_evicted(EvictionCause::Replaced);
                info!(
                    user_id,
                    %connection,
                    replaced = %old.id(),
                    role = handle.role(),
                    "client reconnected; previous connection replaced"
                );
            }
            Some(_) => debug!(user_id, %connection, "connection already registered"),
            None => info!(user_id, %connection, role = handle.role(), "client connected"),
        }
        metrics::set_connections(self.connections.len());
        true
    }

    /// Remove `handle` if it is still the live connection for its user.
    ///
    /// Returns `true` when the entry was removed and its buffer closed. A
    /// handle that has since been replaced is left alone and `false` is
    /// returned.
    pub fn unregister(&self, handle: &ConnectionHandle) -> bool {
        let removed = self
            .connections
            .remove_if(handle.user_id(), |_, current| current.same_connection(handle))
            .is_some();
        if removed {
            handle.close();
            metrics::set_connections(self.connections.len());
            info!(user_id = handle.user_id(), connection = %handle.id(), "client disconnected");
        } else {
            debug!(
                user_id = handle.user_id(),
                connection = %handle.id(),
                "ignoring unregister for stale connection"
            );
        }
        removed
    }

    /// Retrieve the live handle for `user_id`.
    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<ConnectionHandle> {
        self.connections.get(user_id).map(|entry| entry.value().clone())
    }

    /// Deliver `message` to `user_id` without waiting.
    ///
    /// The message is serialized once the recipient is known to be connected.
    /// A full buffer drops the message, and additionally evicts the
    /// connection under [`OverflowPolicy::Evict`]. A buffer whose drain side
    /// has gone away is pruned from the registry.
    pub fn send_to_user(&self, user_id: &str, message: &Message) -> SendOutcome {
        let Some(handle) = self.get(user_id) else {
            metrics::inc_unrouted();
            info!(user_id, "client not found or offline");
            return SendOutcome::NotConnected;
        };

        let frame = match message.encode() {
            Ok(frame) => frame,
            Err(e) => {
                metrics::inc_dropped(DropLabel::Encode);
                error!(user_id, error = %e, "failed to serialize message");
                return SendOutcome::Dropped(DropReason::Encode);
            }
        };

        match handle.try_push(frame) {
            Ok(()) => {
                metrics::inc_delivered();
                debug!(user_id, connection = %handle.id(), "message queued");
                SendOutcome::Delivered
            }
            Err(PushError::Full) => {
                metrics::inc_dropped(DropLabel::BufferFull);
                warn!(
                    user_id,
                    connection = %handle.id(),
                    capacity = handle.capacity(),
                    policy = ?self.overflow,
                    "outbound buffer full; message dropped"
                );
                if self.overflow == OverflowPolicy::Evict {
                    self.evict(&handle, EvictionCause::Overflow);
                }
                SendOutcome::Dropped(DropReason::BufferFull)
            }
            Err(PushError::Closed) => {
                metrics::inc_dropped(DropLabel::BufferClosed);
                warn!(
                    user_id,
                    connection = %handle.id(),
                    "outbound buffer closed; message dropped"
                );
                self.evict(&handle, EvictionCause::Closed);
                SendOutcome::Dropped(DropReason::BufferClosed)
            }
        }
    }

    /// Deliver `message` to the user named by its `receiver_id`.
    ///
    /// Equivalent to `send_to_user(&message.receiver_id, message)`; it does
    /// not fan out to every connected user.
    pub fn broadcast(&self, message: &Message) -> SendOutcome {
        self.send_to_user(&message.receiver_id, message)
    }

    /// Snapshot of the users currently registered, in no particular order.
    #[must_use]
    pub fn connected_users(&self) -> Vec<String> {
        self.connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Whether `user_id` has a live connection.
    #[must_use]
    pub fn is_connected(&self, user_id: &str) -> bool { self.connections.contains_key(user_id) }

    /// Number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize { self.connections.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.connections.is_empty() }

    /// Remove `handle` if still current and close it.
    fn evict(&self, handle: &ConnectionHandle, cause: EvictionCause) {
        let removed = self
            .connections
            .remove_if(handle.user_id(), |_, current| current.same_connection(handle))
            .is_some();
        if !removed {
            return;
        }
        handle.close();
        metrics::inc_evicted(cause);
        metrics::set_connections(self.connections.len());
        warn!(
            user_id = handle.user_id(),
            connection = %handle.id(),
            ?cause,
            "client removed from registry"
        );
    }
}
