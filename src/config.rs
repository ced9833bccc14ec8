//! Registry configuration.
//!
//! [`RegistryConfig`] is plain data that embedding applications deserialize
//! from whatever configuration source they already use. Every field has a
//! default, so an empty document yields a working configuration.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::connection::{
    ConnectionBuilder,
    ConnectionHandle,
    DEFAULT_BUFFER_CAPACITY,
    MAX_BUFFER_CAPACITY,
};

/// Largest command backlog accepted by the coordination loop.
pub const MAX_HUB_CAPACITY: usize = 1 << 20;

/// Behaviour when a recipient's outbound buffer is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the message and keep the connection.
    #[default]
    Drop,
    /// Drop the message and evict the connection, closing its buffer.
    Evict,
}

/// Errors returned by [`RegistryConfig::validate`].
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("buffer_capacity {0} out of range; must be between 1 and {max}", max = MAX_BUFFER_CAPACITY)]
    BufferCapacity(usize),
    #[error("hub_capacity {0} out of range; must be between 1 and {max}", max = MAX_HUB_CAPACITY)]
    HubCapacity(usize),
    #[error("submit_timeout_ms must be greater than zero")]
    SubmitTimeout,
}

/// Settings shared by the registry, its connections and the hub loop.
///
/// The registry only reads `overflow`. Connections pick up `buffer_capacity`
/// when built through [`RegistryConfig::connection`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Pending frames each connection may hold.
    pub buffer_capacity: usize,
    /// What to do when a recipient's buffer is full.
    pub overflow: OverflowPolicy,
    /// Commands the coordination loop may have queued.
    pub hub_capacity: usize,
    /// How long structural submissions wait for hub capacity.
    pub submit_timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            overflow: OverflowPolicy::Drop,
            hub_capacity: 1024,
            submit_timeout_ms: 100,
        }
    }
}

impl RegistryConfig {
    /// Check every field is within its supported range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity == 0 || self.buffer_capacity > MAX_BUFFER_CAPACITY {
            return Err(ConfigError::BufferCapacity(self.buffer_capacity));
        }
        if self.hub_capacity == 0 || self.hub_capacity > MAX_HUB_CAPACITY {
            return Err(ConfigError::HubCapacity(self.hub_capacity));
        }
        if self.submit_timeout_ms == 0 {
            return Err(ConfigError::SubmitTimeout);
        }
        Ok(())
    }

    #[must_use]
    pub fn submit_timeout(&self) -> Duration { Duration::from_millis(self.submit_timeout_ms) }

    /// Start building a connection whose buffer holds `buffer_capacity`
    /// frames.
    #[must_use]
    pub fn connection(
        &self,
        user_id: impl Into<String>,
        role: impl Into<String>,
    ) -> ConnectionBuilder {
        ConnectionHandle::builder(user_id, role).capacity(self.buffer_capacity)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{ConfigError, OverflowPolicy, RegistryConfig};

    #[rstest]
    fn empty_document_uses_defaults() {
        let config: RegistryConfig = serde_json::from_str("{}").expect("parse failed");
        assert_eq!(config, RegistryConfig::default());
        assert_eq!(config.buffer_capacity, 256);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    fn parses_overflow_policy() {
        let config: RegistryConfig =
            serde_json::from_str(r#"{"overflow":"evict","buffer_capacity":8}"#)
                .expect("parse failed");
        assert_eq!(config.overflow, OverflowPolicy::Evict);
        assert_eq!(config.buffer_capacity, 8);
    }

    #[rstest]
    fn connections_use_configured_capacity() {
        let config = RegistryConfig {
            buffer_capacity: 8,
            ..RegistryConfig::default()
        };
        let (handle, _outbound) = config
            .connection("u1", "candidate")
            .build()
            .expect("failed to build connection");
        assert_eq!(handle.capacity(), 8);
        assert_eq!(handle.role(), "candidate");
    }

    #[rstest]
    #[case::zero_buffer(RegistryConfig { buffer_capacity: 0, ..RegistryConfig::default() }, ConfigError::BufferCapacity(0))]
    #[case::huge_buffer(RegistryConfig { buffer_capacity: 1 << 24, ..RegistryConfig::default() }, ConfigError::BufferCapacity(1 << 24))]
    #[case::zero_hub(RegistryConfig { hub_capacity: 0, ..RegistryConfig::default() }, ConfigError::HubCapacity(0))]
    #[case::zero_timeout(RegistryConfig { submit_timeout_ms: 0, ..RegistryConfig::default() }, ConfigError::SubmitTimeout)]
    fn rejects_out_of_range_values(#[case] config: RegistryConfig, #[case] expected: ConfigError) {
        assert_eq!(config.validate(), Err(expected));
    }
}
