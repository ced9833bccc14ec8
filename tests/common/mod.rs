//! Shared utilities for integration tests.

#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::sync::Arc;

use fanout::{Registry, RegistryConfig, hub};
use tokio_util::sync::CancellationToken;

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Spawn a hub over a fresh registry, returning the handle, the loop task
/// and the token that stops it.
pub fn spawn_hub(
    config: &RegistryConfig,
) -> (hub::HubHandle, tokio::task::JoinHandle<()>, CancellationToken) {
    let registry = Arc::new(Registry::new(config));
    let shutdown = CancellationToken::new();
    let (handle, task) = hub::spawn(registry, config, shutdown.clone());
    (handle, task, shutdown)
}
