// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use telemetry_batcher::{Sink, SinkError};
use tokio::time::Instant;

/// One downstream call as seen by the sink
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub partition_key: String,
    pub entries: Vec<String>,
    pub at: Instant,
}

/// Records every call and fails those whose partition is in `failing`
#[derive(Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<RecordedCall>>,
    failing: HashSet<String>,
}

impl RecordingSink {
    pub fn failing_for(partitions: &[&str]) -> Self {
        RecordingSink {
            calls: Mutex::new(Vec::new()),
            failing: partitions.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    pub fn calls_for(&self, partition_key: &str) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|call| call.partition_key == partition_key)
            .map(|call| call.entries)
            .collect()
    }
}

#[async_trait]
impl Sink<String> for RecordingSink {
    async fn submit_batch(
        &self,
        partition_key: &str,
        entries: Vec<String>,
    ) -> Result<(), SinkError> {
        if self.failing.contains(partition_key) {
            return Err(SinkError::Delivery(format!(
                "503 Service Unavailable for {partition_key}"
            )));
        }
        self.calls.lock().expect("lock poisoned").push(RecordedCall {
            partition_key: partition_key.to_string(),
            entries,
            at: Instant::now(),
        });
        Ok(())
    }
}
