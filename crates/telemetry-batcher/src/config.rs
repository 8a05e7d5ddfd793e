// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::errors::ConfigError;
use std::env;
use std::time::Duration;

pub const DEFAULT_MAX_BATCH_SIZE: usize = 20;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_PER_REQUEST: usize = 20;

/// Configuration for the batch queue, fixed at construction
#[derive(Debug, Clone, PartialEq)]
pub struct BatchQueueConfig {
    /// Number of entries that closes a batch (count trigger)
    pub max_batch_size: usize,
    /// Maximum time a batch stays open (time trigger)
    pub flush_interval: Duration,
    /// Maximum number of entries in a single downstream call
    pub max_per_request: usize,
    /// Wait for in-flight dispatch work before reporting `ShutDown`
    pub await_in_flight_on_shutdown: bool,
}

impl Default for BatchQueueConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_per_request: DEFAULT_MAX_PER_REQUEST,
            await_in_flight_on_shutdown: true,
        }
    }
}

impl BatchQueueConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_batch_size = env::var("BATCH_QUEUE_MAX_BATCH_SIZE")
            .ok()
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_BATCH_SIZE);
        let flush_interval = env::var("BATCH_QUEUE_FLUSH_INTERVAL_SECS")
            .ok()
            .and_then(|val| val.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_FLUSH_INTERVAL);
        let max_per_request = env::var("BATCH_QUEUE_MAX_PER_REQUEST")
            .ok()
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_PER_REQUEST);
        let await_in_flight_on_shutdown = env::var("BATCH_QUEUE_AWAIT_IN_FLIGHT")
            .map(|val| !is_disabled(&val))
            .unwrap_or(true);

        let config = Self {
            max_batch_size,
            flush_interval,
            max_per_request,
            await_in_flight_on_shutdown,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "max_batch_size must be greater than 0".to_string(),
            ));
        }

        if self.max_per_request == 0 {
            return Err(ConfigError::Invalid(
                "max_per_request must be greater than 0".to_string(),
            ));
        }

        if self.flush_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "flush_interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// `false`, `0`, `no` and `off` (any case) turn a flag off.
fn is_disabled(val: &str) -> bool {
    matches!(
        val.trim().to_lowercase().as_str(),
        "false" | "0" | "no" | "off"
    )
}
