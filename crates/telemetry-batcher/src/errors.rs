// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors surfaced to callers of the lifecycle operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Shutdown invoked before start")]
    ShutdownBeforeStart,

    #[error("Batch queue service is not running")]
    ServiceUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Failure reported by a [`crate::Sink`]. Either way the sub-batch is dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to prepare payload: {0}")]
    Payload(String),

    #[error("Failed to deliver batch: {0}")]
    Delivery(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            QueueError::ShutdownBeforeStart.to_string(),
            "Shutdown invoked before start"
        );
        assert_eq!(
            ConfigError::Invalid("max_batch_size must be greater than 0".to_string()).to_string(),
            "Invalid configuration: max_batch_size must be greater than 0"
        );
        assert_eq!(
            SinkError::Delivery("503 Service Unavailable".to_string()).to_string(),
            "Failed to deliver batch: 503 Service Unavailable"
        );
    }
}
