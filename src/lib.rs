#![doc(html_root_url = "https://docs.rs/fanout/latest")]
//! In-process fan-out of real-time messages to live client connections.
//!
//! A [`Registry`] tracks at most one [`ConnectionHandle`] per user and
//! delivers [`Message`]s to them on a best-effort basis: a message is placed
//! on the recipient's bounded buffer immediately or dropped, and the caller
//! learns which through a [`SendOutcome`]. Collaborators that own the
//! transport drain each buffer with an [`OutboundWriter`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use fanout::{ConnectionHandle, LineTransport, Message, OutboundWriter, Registry};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(Registry::default());
//! let (handle, outbound) = ConnectionHandle::builder("u1", "candidate").build()?;
//! registry.register(handle.clone());
//!
//! let writer = OutboundWriter::new(
//!     outbound,
//!     LineTransport::new(tokio::io::sink()),
//!     CancellationToken::new(),
//! );
//! let task = tokio::spawn(writer.run());
//!
//! let outcome = registry.send_to_user("u1", &Message::new("chat", "u2", "u1", "hello"));
//! assert!(outcome.is_delivered());
//!
//! registry.unregister(&handle);
//! task.await??;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod hub;
pub mod message;
pub mod metrics;
pub mod registry;

pub use config::{ConfigError, OverflowPolicy, RegistryConfig};
pub use connection::{
    ConnectionConfigError,
    ConnectionHandle,
    ConnectionId,
    LineTransport,
    Outbound,
    OutboundWriter,
    PushError,
    Transport,
};
pub use hub::{Hub, HubHandle, SubmitError};
pub use message::{Message, MessageError};
pub use registry::{DropReason, Registry, SendOutcome};
