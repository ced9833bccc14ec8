//! Coordination loop serializing structural changes to a [`Registry`].
//!
//! Collaborators that prefer message passing over calling the registry
//! directly submit commands through a cloneable [`HubHandle`]. A single
//! [`Hub`] task applies them in submission order. Reads and direct sends go
//! straight to the shared registry and never queue behind the loop.
//!
//! Submissions never block indefinitely: registrations wait at most the
//! configured submit timeout for channel capacity, and broadcasts are either
//! enqueued immediately or rejected.

use std::{sync::Arc, time::Duration};

use log::{info, warn};
use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::RegistryConfig,
    connection::ConnectionHandle,
    message::Message,
    metrics,
    registry::{Registry, SendOutcome},
};

/// Errors returned when a command cannot be handed to the hub loop.
#[non_exhaustive]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// The command channel stayed full for the whole submit window.
    #[error("hub command queue saturated")]
    Saturated,
    /// The hub loop has stopped.
    #[error("hub loop stopped")]
    Stopped,
}

#[derive(Debug)]
enum Command {
    Register(ConnectionHandle),
    Unregister(ConnectionHandle),
    Broadcast(Message),
    Sync(oneshot::Sender<()>),
}

/// Single consumer applying submitted commands to the registry.
pub struct Hub {
    registry: Arc<Registry>,
    commands: mpsc::Receiver<Command>,
    shutdown: CancellationToken,
}

impl Hub {
    /// Create the loop and the handle used to feed it.
    ///
    /// The command channel holds `config.hub_capacity` entries.
    #[must_use]
    pub fn new(
        registry: Arc<Registry>,
        config: &RegistryConfig,
        shutdown: CancellationToken,
    ) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(config.hub_capacity.max(1));
        let handle = HubHandle {
            commands: tx,
            registry: Arc::clone(&registry),
            submit_timeout: config.submit_timeout(),
        };
        let hub = Self {
            registry,
            commands: rx,
            shutdown,
        };
        (hub, handle)
    }

    /// Apply commands until `shutdown` fires or every handle is dropped.
    ///
    /// Commands already queued when shutdown is requested are still applied;
    /// later submissions fail with [`SubmitError::Stopped`].
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => break,

                command = self.commands.recv() => match command {
                    Some(command) => self.apply(command),
                    None => break,
                },
            }
        }

        self.commands.close();
        while let Some(command) = self.commands.recv().await {
            self.apply(command);
        }
        info!("hub loop stopped");
    }

    fn apply(&self, command: Command) {
        match command {
            Command::Register(handle) => {
                self.registry.register(handle);
            }
            Command::Unregister(handle) => {
                self.registry.unregister(&handle);
            }
            Command::Broadcast(message) => {
                let _ = self.registry.broadcast(&message);
            }
            Command::Sync(done) => {
                let _ = done.send(());
            }
        }
    }
}

/// Start a [`Hub`] on the current Tokio runtime.
#[must_use]
pub fn spawn(
    registry: Arc<Registry>,
    config: &RegistryConfig,
    shutdown: CancellationToken,
) -> (HubHandle, JoinHandle<()>) {
    let (hub, handle) = Hub::new(registry, config, shutdown);
    (handle, tokio::spawn(hub.run()))
}

/// Cloneable front end to a running [`Hub`].
#[derive(Clone, Debug)]
pub struct HubHandle {
    commands: mpsc::Sender<Command>,
    registry: Arc<Registry>,
    submit_timeout: Duration,
}

impl HubHandle {
    /// Queue `handle` for registration.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Saturated`] if no capacity frees up within the
    /// submit timeout and [`SubmitError::Stopped`] if the loop has ended.
    pub async fn register(&self, handle: ConnectionHandle) -> Result<(), SubmitError> {
        self.submit(Command::Register(handle)).await
    }

    /// Queue `handle` for removal. Stale handles are ignored by the loop.
    ///
    /// # Errors
    ///
    /// As for [`HubHandle::register`].
    pub async fn unregister(&self, handle: ConnectionHandle) -> Result<(), SubmitError> {
        self.submit(Command::Unregister(handle)).await
    }

    /// Queue `message` for delivery to its `receiver_id` without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Saturated`] if the command queue is full, in
    /// which case the message is dropped, and [`SubmitError::Stopped`] if the
    /// loop has ended.
    pub fn broadcast(&self, message: Message) -> Result<(), SubmitError> {
        match self.commands.try_send(Command::Broadcast(message)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(Command::Broadcast(message))) => {
                metrics::inc_hub_rejected();
                warn!(
                    "hub queue full; message for {} dropped",
                    message.receiver_id
                );
                Err(SubmitError::Saturated)
            }
            Err(mpsc::error::TrySendError::Full(_)) => Err(SubmitError::Saturated),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SubmitError::Stopped),
        }
    }

    /// Wait until every command submitted before this call has been applied.
    ///
    /// # Errors
    ///
    /// As for [`HubHandle::register`].
    pub async fn sync(&self) -> Result<(), SubmitError> {
        let (tx, rx) = oneshot::channel();
        self.submit(Command::Sync(tx)).await?;
        rx.await.map_err(|_| SubmitError::Stopped)
    }

    /// Deliver directly through the registry, bypassing the loop.
    pub fn send_to_user(&self, user_id: &str, message: &Message) -> SendOutcome {
        self.registry.send_to_user(user_id, message)
    }

    #[must_use]
    pub fn is_connected(&self, user_id: &str) -> bool { self.registry.is_connected(user_id) }

    #[must_use]
    pub fn connected_users(&self) -> Vec<String> { self.registry.connected_users() }

    /// Registry the loop mutates.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> { &self.registry }

    async fn submit(&self, command: Command) -> Result<(), SubmitError> {
        self.commands
            .send_timeout(command, self.submit_timeout)
            .await
            .map_err(|e| match e {
                mpsc::error::SendTimeoutError::Timeout(_) => {
                    metrics::inc_hub_rejected();
                    warn!(
                        "hub queue saturated for {:?}; command rejected",
                        self.submit_timeout
                    );
                    SubmitError::Saturated
                }
                mpsc::error::SendTimeoutError::Closed(_) => SubmitError::Stopped,
            })
    }
}
