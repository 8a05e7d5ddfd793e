// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ships closed batches to the downstream [`Sink`].
//!
//! One task per partition: partitions of the same batch are sent
//! concurrently, sub-batches of one partition go out in emission order.
//! Failed calls are logged and the sub-batch is dropped.

use crate::entry::Entry;
use crate::errors::SinkError;
use crate::partitioner::{partition, SubBatch};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Downstream collaborator receiving one call per sub-batch.
///
/// Implementations own request construction, auth and retries. Any error
/// returned here is final for that sub-batch.
#[async_trait]
pub trait Sink<T>: Send + Sync {
    async fn submit_batch(&self, partition_key: &str, entries: Vec<T>) -> Result<(), SinkError>;
}

/// Outcome of dispatching one batch
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    pub sent: usize,
    pub failed: usize,
}

pub struct Dispatcher<T> {
    sink: Arc<dyn Sink<T>>,
    max_per_request: usize,
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Dispatcher {
            sink: Arc::clone(&self.sink),
            max_per_request: self.max_per_request,
        }
    }
}

impl<T: Send + 'static> Dispatcher<T> {
    pub fn new(sink: Arc<dyn Sink<T>>, max_per_request: usize) -> Self {
        Dispatcher {
            sink,
            max_per_request,
        }
    }

    /// Partitions `batch` and sends every sub-batch. Empty batches are a no-op.
    pub async fn dispatch(&self, batch: Vec<Entry<T>>) -> DispatchSummary {
        if batch.is_empty() {
            return DispatchSummary::default();
        }

        let n_entries = batch.len();
        let partitions = partition(batch, self.max_per_request);
        debug!(
            "Dispatching {n_entries} entries across {} partitions",
            partitions.len()
        );

        let mut set = JoinSet::new();
        for (_, sub_batches) in partitions {
            let sink = Arc::clone(&self.sink);
            set.spawn(async move { ship_partition(sink, sub_batches).await });
        }

        let mut summary = DispatchSummary::default();
        while let Some(result) = set.join_next().await {
            match result {
                Ok(partition_summary) => {
                    summary.sent += partition_summary.sent;
                    summary.failed += partition_summary.failed;
                }
                Err(e) => error!("Failed to join partition dispatch task: {e}"),
            }
        }
        summary
    }
}

async fn ship_partition<T>(sink: Arc<dyn Sink<T>>, sub_batches: Vec<SubBatch<T>>) -> DispatchSummary {
    let mut summary = DispatchSummary::default();
    for SubBatch {
        partition_key,
        entries,
    } in sub_batches
    {
        let batch_size = entries.len();
        match sink.submit_batch(partition_key.as_str(), entries).await {
            Ok(()) => summary.sent += 1,
            Err(e) => {
                summary.failed += 1;
                match &e {
                    SinkError::Payload(_) => error!(
                        partition_key = partition_key.as_str(),
                        batch_size,
                        error = %e,
                        "Failed to prepare sub-batch. Data dropped"
                    ),
                    SinkError::Delivery(_) => error!(
                        partition_key = partition_key.as_str(),
                        batch_size,
                        error = %e,
                        "Failed to submit sub-batch. Data dropped"
                    ),
                }
            }
        }
    }
    summary
}
