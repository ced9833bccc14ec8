//! Metric helpers for `fanout`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. With the `metrics` feature
//! disabled every helper compiles to a no-op.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking registered connections.
pub const CONNECTIONS_ACTIVE: &str = "fanout_connections_active";
/// Name of the counter tracking messages placed on a buffer.
pub const MESSAGES_DELIVERED: &str = "fanout_messages_delivered_total";
/// Name of the counter tracking dropped messages, labelled by `reason`.
pub const MESSAGES_DROPPED: &str = "fanout_messages_dropped_total";
/// Name of the counter tracking messages addressed to offline users.
pub const MESSAGES_UNROUTED: &str = "fanout_messages_unrouted_total";
/// Name of the counter tracking evicted connections, labelled by `cause`.
pub const CONNECTIONS_EVICTED: &str = "fanout_connections_evicted_total";
/// Name of the counter tracking commands the hub loop refused.
pub const HUB_REJECTED: &str = "fanout_hub_rejected_total";

/// Why a message never reached a buffer.
#[derive(Clone, Copy, Debug)]
pub enum DropLabel {
    BufferFull,
    BufferClosed,
    Encode,
}

impl DropLabel {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            DropLabel::BufferFull => "buffer_full",
            DropLabel::BufferClosed => "buffer_closed",
            DropLabel::Encode => "encode",
        }
    }
}

/// Why a connection left the registry without being unregistered.
#[derive(Clone, Copy, Debug)]
pub enum EvictionCause {
    /// A newer connection registered for the same user.
    Replaced,
    /// The buffer was full under [`OverflowPolicy::Evict`](crate::config::OverflowPolicy::Evict).
    Overflow,
    /// The drain side had gone away.
    Closed,
}

impl EvictionCause {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            EvictionCause::Replaced => "replaced",
            EvictionCause::Overflow => "overflow",
            EvictionCause::Closed => "closed",
        }
    }
}

/// Record the current number of registered connections.
#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
#[cfg_attr(
    feature = "metrics",
    expect(clippy::cast_precision_loss, reason = "gauge values are f64")
)]
pub fn set_connections(count: usize) {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).set(count as f64);
}

/// Record a message placed on a buffer.
pub fn inc_delivered() {
    #[cfg(feature = "metrics")]
    counter!(MESSAGES_DELIVERED).increment(1);
}

/// Record a dropped message.
#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
pub fn inc_dropped(label: DropLabel) {
    #[cfg(feature = "metrics")]
    counter!(MESSAGES_DROPPED, "reason" => label.as_str()).increment(1);
}

/// Record a message for a user with no live connection.
pub fn inc_unrouted() {
    #[cfg(feature = "metrics")]
    counter!(MESSAGES_UNROUTED).increment(1);
}

/// Record an eviction.
#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
pub fn inc_evicted(cause: EvictionCause) {
    #[cfg(feature = "metrics")]
    counter!(CONNECTIONS_EVICTED, "cause" => cause.as_str()).increment(1);
}

/// Record a command the hub loop could not accept.
pub fn inc_hub_rejected() {
    #[cfg(feature = "metrics")]
    counter!(HUB_REJECTED).increment(1);
}
