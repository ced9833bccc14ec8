//! Error types for outbound buffer operations and connection construction.

use thiserror::Error;

use super::MAX_BUFFER_CAPACITY;

/// Errors that can occur when enqueuing a frame.
#[non_exhaustive]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PushError {
    /// The buffer was at capacity.
    #[error("outbound buffer full")]
    Full,
    /// The handle was closed or the draining side has been dropped.
    #[error("outbound buffer closed")]
    Closed,
}

/// Errors returned when building a connection handle.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionConfigError {
    /// Connections must be keyed by a non-empty user id.
    #[error("user id must not be empty")]
    EmptyUserId,
    /// The requested buffer capacity was zero or too large.
    #[error("invalid buffer capacity {0}; must be between 1 and {max}", max = MAX_BUFFER_CAPACITY)]
    InvalidCapacity(usize),
}
