// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use telemetry_batcher::{BatchQueueConfig, ConfigError};

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration for the agent binary
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub queue: BatchQueueConfig,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let queue = BatchQueueConfig::from_env()?;
        let log_level = env::var("BATCH_QUEUE_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or_else(|_| "info".to_string());

        if !VALID_LOG_LEVELS.contains(&log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                log_level
            )));
        }

        Ok(Self { queue, log_level })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_log_level_defaults_to_info() {
        env::remove_var("BATCH_QUEUE_LOG_LEVEL");
        let config = AgentConfig::from_env().expect("config should be valid");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    #[serial]
    fn test_log_level_is_lowercased() {
        env::set_var("BATCH_QUEUE_LOG_LEVEL", "DEBUG");
        let config = AgentConfig::from_env();
        env::remove_var("BATCH_QUEUE_LOG_LEVEL");
        assert_eq!(config.expect("config should be valid").log_level, "debug");
    }

    #[test]
    #[serial]
    fn test_invalid_log_level() {
        env::set_var("BATCH_QUEUE_LOG_LEVEL", "verbose");
        let result = AgentConfig::from_env();
        env::remove_var("BATCH_QUEUE_LOG_LEVEL");
        assert!(result.is_err());
    }
}
