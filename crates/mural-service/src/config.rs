//! Service configuration

use mural_core::{GridConfig, Timestamp};
use mural_payment::DEFAULT_WINDOW_MS;
use serde::{Deserialize, Serialize};

/// Canvas service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Grid dimensions and cooldown
    pub grid: GridConfig,
    /// Confirmation window for bypass authorizations, in milliseconds
    pub authorization_window_ms: Timestamp,
    /// Interval between expiry sweeps, in milliseconds
    pub sweep_interval_ms: u64,
    /// Broadcast channel capacity per grid instance
    pub broadcast_capacity: usize,
    /// Inbound mutation queue depth
    pub pipeline_queue_depth: usize,
}

impl ServiceConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With grid configuration
    #[inline]
    #[must_use]
    pub fn with_grid(mut self, grid: GridConfig) -> Self {
        self.grid = grid;
        self
    }

    /// With authorization confirmation window
    #[inline]
    #[must_use]
    pub fn with_authorization_window_ms(mut self, window_ms: Timestamp) -> Self {
        self.authorization_window_ms = window_ms;
        self
    }

    /// With broadcast channel capacity
    #[inline]
    #[must_use]
    pub fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            authorization_window_ms: DEFAULT_WINDOW_MS,
            sweep_interval_ms: 60_000,
            broadcast_capacity: 1024,
            pipeline_queue_depth: 256,
        }
    }
}
