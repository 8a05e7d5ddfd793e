// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod config;
mod record;
mod sink;

use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use config::AgentConfig;
use record::parse_record;
use sink::JsonLinesSink;
use telemetry_batcher::{BatchQueueHandle, BatchQueueService};

#[tokio::main]
pub async fn main() {
    let config = match AgentConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error creating config on telemetry batcher startup: {e}");
            return;
        }
    };

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::new(config.log_level.as_str()))
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Setting default subscriber failed: {e}");
        return;
    }

    debug!("Logging subsystem enabled");

    let sink = Arc::new(JsonLinesSink::new(std::io::stdout()));
    let (service, handle) =
        match BatchQueueService::<serde_json::Value>::new(config.queue.clone(), sink) {
            Ok(created) => created,
            Err(e) => {
                error!("Error creating batch queue: {e}");
                return;
            }
        };
    let service_task = tokio::spawn(service.run());

    handle.start();
    info!(
        "Batching stdin records: max_batch_size={} flush_interval={:?} max_per_request={}",
        config.queue.max_batch_size, config.queue.flush_interval, config.queue.max_per_request
    );

    // A blocking stdin read cannot be cancelled, so it gets its own thread
    // rather than the runtime's blocking pool, which would hold up exit.
    let stdin = std::io::BufReader::new(std::io::stdin());
    let input_done = match spawn_reader(stdin, handle.clone()) {
        Ok(input_done) => input_done,
        Err(e) => {
            error!("Failed to spawn stdin reader: {e}");
            return;
        }
    };

    let input_closed = tokio::select! {
        result = input_done => {
            match result {
                Ok(n_records) => debug!("Input closed after {n_records} records"),
                Err(_) => error!("Stdin reader stopped unexpectedly"),
            }
            true
        }
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signal: {e}");
            }
            debug!("Received shutdown signal");
            false
        }
    };

    if let Err(e) = handle.shutdown().await {
        error!("Failed to shut down batch queue: {e}");
    }
    if let Err(e) = handle.await_shutdown().await {
        error!("Failed waiting for batch queue shutdown: {e}");
    }
    drop(handle);

    // the reader thread still holds a handle when interrupted
    if input_closed {
        if let Err(e) = service_task.await {
            error!("Batch queue service task failed: {e}");
        }
    }
    info!("Telemetry batcher stopped");
}

/// Runs [`read_records`] on a dedicated thread, reporting the record count
/// once the input ends.
fn spawn_reader<R: BufRead + Send + 'static>(
    reader: R,
    handle: BatchQueueHandle<serde_json::Value>,
) -> std::io::Result<oneshot::Receiver<usize>> {
    let (done_tx, done_rx) = oneshot::channel();
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let n_records = read_records(reader, &handle);
            drop(handle);
            let _ = done_tx.send(n_records);
        })?;
    Ok(done_rx)
}

/// Submits every valid line until EOF and returns how many were accepted
fn read_records<R: BufRead>(reader: R, handle: &BatchQueueHandle<serde_json::Value>) -> usize {
    let mut n_records = 0;

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read input: {e}");
                break;
            }
        };
        match parse_record(&line) {
            Some(Ok(record)) => {
                handle.submit(&record.partition_key, record.payload);
                n_records += 1;
            }
            Some(Err(e)) => warn!("Skipping input line: {e}"),
            None => {}
        }
    }

    n_records
}
