//! Test fixtures shared by the `fanout` integration tests.
//!
//! Provides a log-capturing fixture, an in-memory [`Transport`] and helpers
//! for building connections and messages.
//!
//! ```rust
//! use fanout::Registry;
//! use fanout_testing::{chat, connect};
//!
//! let registry = Registry::default();
//! let (handle, mut outbound) = connect("u1", 4);
//! registry.register(handle);
//! assert!(registry.send_to_user("u1", &chat("u2", "u1", "hi")).is_delivered());
//! assert!(outbound.try_recv().is_some());
//! ```
//!
//! [`Transport`]: fanout::Transport

pub mod helpers;
pub mod logging;
pub mod transport;

pub use helpers::{chat, connect, decode_all};
pub use logging::{LoggerHandle, logger};
pub use transport::{MemoryTransport, Recorded};
