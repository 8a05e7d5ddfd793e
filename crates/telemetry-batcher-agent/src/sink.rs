// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use serde::Serialize;
use std::io::Write;
use std::sync::Mutex;
use telemetry_batcher::{Sink, SinkError};

#[derive(Serialize)]
struct SubBatchLine<'a> {
    partition_key: &'a str,
    entries: &'a [serde_json::Value],
}

/// Writes each sub-batch as one JSON line.
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesSink {
            writer: Mutex::new(writer),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        #[allow(clippy::expect_used)]
        self.writer.into_inner().expect("lock poisoned")
    }
}

#[async_trait]
impl<W: Write + Send> Sink<serde_json::Value> for JsonLinesSink<W> {
    async fn submit_batch(
        &self,
        partition_key: &str,
        entries: Vec<serde_json::Value>,
    ) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(&SubBatchLine {
            partition_key,
            entries: &entries,
        })
        .map_err(|e| SinkError::Payload(e.to_string()))?;
        line.push(b'\n');

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| SinkError::Delivery("writer lock poisoned".to_string()))?;
        writer
            .write_all(&line)
            .and_then(|()| writer.flush())
            .map_err(|e| SinkError::Delivery(e.to_string()))
    }
}
