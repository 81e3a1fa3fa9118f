/*!
 * Socket Configuration
 * Runtime-tunable limits for the socket layer
 */

use crate::core::errors::KernelError;
use crate::core::limits::{DEFAULT_DATAGRAM_QUEUE_LEN, DEFAULT_STREAM_BUFFER_SIZE, SOMAXCONN};
use crate::core::types::KernelResult;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Socket layer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SocketConfig {
    /// Ceiling applied to every `listen()` backlog
    pub max_backlog: usize,
    /// Bytes buffered per direction of a stream connection
    pub stream_buffer_size: usize,
    /// Datagrams buffered per receiving endpoint
    pub datagram_queue_len: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            max_backlog: SOMAXCONN,
            stream_buffer_size: DEFAULT_STREAM_BUFFER_SIZE,
            datagram_queue_len: DEFAULT_DATAGRAM_QUEUE_LEN,
        }
    }
}

impl SocketConfig {
    /// Defaults overridden by environment variables
    ///
    /// - KERNEL_SOCKET_MAX_BACKLOG
    /// - KERNEL_SOCKET_BUFFER_SIZE
    /// - KERNEL_SOCKET_DGRAM_QUEUE
    pub fn from_env() -> Self {
        let mut config = Self::default();
        apply_env("KERNEL_SOCKET_MAX_BACKLOG", &mut config.max_backlog);
        apply_env("KERNEL_SOCKET_BUFFER_SIZE", &mut config.stream_buffer_size);
        apply_env("KERNEL_SOCKET_DGRAM_QUEUE", &mut config.datagram_queue_len);
        config
    }

    /// Parse and validate a JSON document; missing fields take defaults
    pub fn from_json(json: &str) -> KernelResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> KernelResult<()> {
        if self.max_backlog == 0 {
            return Err(KernelError::configuration("max_backlog must be at least 1"));
        }
        if self.stream_buffer_size == 0 {
            return Err(KernelError::configuration(
                "stream_buffer_size must be at least 1",
            ));
        }
        if self.datagram_queue_len == 0 {
            return Err(KernelError::configuration(
                "datagram_queue_len must be at least 1",
            ));
        }
        Ok(())
    }

    /// Effective backlog for a `listen(requested)` call; never below 1,
    /// even for an unvalidated `max_backlog` of 0
    #[inline]
    pub fn clamp_backlog(&self, requested: usize) -> usize {
        requested.clamp(1, self.max_backlog.max(1))
    }
}

fn apply_env(var: &str, slot: &mut usize) {
    let Ok(raw) = std::env::var(var) else {
        return;
    };
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => *slot = value,
        _ => warn!(var, value = %raw, "ignoring invalid socket configuration value"),
    }
}
