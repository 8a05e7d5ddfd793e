// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::mocks::RecordingSink;
use std::sync::Arc;
use std::time::Duration;
use telemetry_batcher::{BatchQueueConfig, BatchQueueHandle, BatchQueueService};

pub fn test_config(
    max_batch_size: usize,
    max_per_request: usize,
    flush_interval_secs: u64,
) -> BatchQueueConfig {
    BatchQueueConfig {
        max_batch_size,
        flush_interval: Duration::from_secs(flush_interval_secs),
        max_per_request,
        await_in_flight_on_shutdown: true,
    }
}

/// Spawns the service for `sink` and returns a started handle
pub fn start_queue(
    config: BatchQueueConfig,
    sink: Arc<RecordingSink>,
) -> BatchQueueHandle<String> {
    let (service, handle) = BatchQueueService::<String>::new(config, sink)
        .expect("failed to create batch queue service");
    tokio::spawn(service.run());
    handle.start();
    handle
}

pub fn submit_all(handle: &BatchQueueHandle<String>, partition_key: &str, payloads: &[&str]) {
    for payload in payloads {
        handle.submit(partition_key, payload.to_string());
    }
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
