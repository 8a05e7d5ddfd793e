// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Lifecycle actor for the batch queue.
//!
//! The service task is the only owner of the queue state and the shutdown
//! waiters. Handles talk to it through a command channel, so transitions are
//! processed one at a time without locks. Submissions bypass the actor and go
//! straight into the intake channel.
//!
//! ```text
//!   Initialized ──start──> Running ──shutdown──> ShuttingDown ──drained──> ShutDown
//! ```

use crate::chunker::Chunker;
use crate::config::BatchQueueConfig;
use crate::dispatcher::{DispatchSummary, Dispatcher, Sink};
use crate::entry::Entry;
use crate::errors::{ConfigError, QueueError};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Initialized,
    Running,
    ShuttingDown,
    ShutDown,
}

#[derive(Debug)]
pub(crate) enum QueueCommand {
    Start,
    Shutdown(oneshot::Sender<Result<(), QueueError>>),
    AwaitShutdown(oneshot::Sender<()>),
    GetState(oneshot::Sender<QueueState>),
}

/// Cloneable handle to a [`BatchQueueService`].
pub struct BatchQueueHandle<T> {
    intake: mpsc::UnboundedSender<Entry<T>>,
    tx: mpsc::UnboundedSender<QueueCommand>,
}

impl<T> Clone for BatchQueueHandle<T> {
    fn clone(&self) -> Self {
        BatchQueueHandle {
            intake: self.intake.clone(),
            tx: self.tx.clone(),
        }
    }
}

impl<T> BatchQueueHandle<T> {
    /// Enqueues an entry without blocking. Never fails: entries submitted
    /// after the intake has closed are dropped and logged.
    pub fn submit(&self, partition_key: &str, payload: T) {
        if self.intake.send(Entry::new(partition_key, payload)).is_err() {
            warn!("Intake closed, dropping entry for partition {partition_key}");
        }
    }

    /// Begins processing. Calling it again in any later state is a no-op.
    pub fn start(&self) {
        if self.tx.send(QueueCommand::Start).is_err() {
            error!("Failed to send start command - batch queue service stopped");
        }
    }

    /// Closes the intake and begins a graceful stop.
    ///
    /// Fails with [`QueueError::ShutdownBeforeStart`] if the queue was never
    /// started. Repeated calls once shutdown has begun succeed without effect.
    pub async fn shutdown(&self) -> Result<(), QueueError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(QueueCommand::Shutdown(response_tx))
            .map_err(|_| QueueError::ServiceUnavailable)?;

        response_rx
            .await
            .map_err(|_| QueueError::ServiceUnavailable)?
    }

    /// Resolves once the queue reaches [`QueueState::ShutDown`].
    ///
    /// Resolves immediately if it already has. If shutdown is never
    /// initiated this waits forever.
    pub async fn await_shutdown(&self) -> Result<(), QueueError> {
        let (waiter_tx, waiter_rx) = oneshot::channel();
        self.tx
            .send(QueueCommand::AwaitShutdown(waiter_tx))
            .map_err(|_| QueueError::ServiceUnavailable)?;

        waiter_rx.await.map_err(|_| QueueError::ServiceUnavailable)
    }

    pub async fn state(&self) -> Result<QueueState, QueueError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(QueueCommand::GetState(response_tx))
            .map_err(|_| QueueError::ServiceUnavailable)?;

        response_rx
            .await
            .map_err(|_| QueueError::ServiceUnavailable)
    }
}

pub struct BatchQueueService<T> {
    config: BatchQueueConfig,
    rx: mpsc::UnboundedReceiver<QueueCommand>,
    state: QueueState,
    waiters: Vec<oneshot::Sender<()>>,
    intake: Option<mpsc::UnboundedReceiver<Entry<T>>>,
    // Keeps the intake open when every handle is gone; only `close` ends it.
    _intake_tx: mpsc::UnboundedSender<Entry<T>>,
    close: CancellationToken,
    dispatcher: Dispatcher<T>,
    consumption: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> BatchQueueService<T> {
    pub fn new(
        config: BatchQueueConfig,
        sink: Arc<dyn Sink<T>>,
    ) -> Result<(Self, BatchQueueHandle<T>), ConfigError> {
        config.validate()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let (intake_tx, intake_rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(sink, config.max_per_request);

        let service = Self {
            config,
            rx,
            state: QueueState::Initialized,
            waiters: Vec::new(),
            intake: Some(intake_rx),
            _intake_tx: intake_tx.clone(),
            close: CancellationToken::new(),
            dispatcher,
            consumption: None,
        };

        let handle = BatchQueueHandle {
            intake: intake_tx,
            tx,
        };

        Ok((service, handle))
    }

    /// Runs until every handle has been dropped and any consumption started
    /// by `start` has finished.
    pub async fn run(mut self) {
        debug!("Batch queue service started");
        let mut handles_dropped = false;

        loop {
            tokio::select! {
                command = self.rx.recv(), if !handles_dropped => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        handles_dropped = true;
                        if self.state == QueueState::Running {
                            debug!("All batch queue handles dropped, shutting down");
                            self.begin_shutdown();
                        }
                    }
                },
                result = join_consumption(&mut self.consumption) => {
                    self.consumption = None;
                    self.finish_consumption(result);
                }
            }

            if handles_dropped && self.consumption.is_none() {
                break;
            }
        }

        debug!("Batch queue service stopped");
    }

    fn handle_command(&mut self, command: QueueCommand) {
        match command {
            QueueCommand::Start => self.start(),

            QueueCommand::Shutdown(response_tx) => {
                let response = match self.state {
                    QueueState::Initialized => Err(QueueError::ShutdownBeforeStart),
                    QueueState::Running => {
                        self.begin_shutdown();
                        Ok(())
                    }
                    QueueState::ShuttingDown | QueueState::ShutDown => Ok(()),
                };
                if response_tx.send(response).is_err() {
                    debug!("Failed to send shutdown response - receiver dropped");
                }
            }

            QueueCommand::AwaitShutdown(waiter) => {
                if self.state == QueueState::ShutDown {
                    let _ = waiter.send(());
                } else {
                    self.waiters.push(waiter);
                }
            }

            QueueCommand::GetState(response_tx) => {
                if response_tx.send(self.state).is_err() {
                    debug!("Failed to send state response - receiver dropped");
                }
            }
        }
    }

    fn start(&mut self) {
        if self.state != QueueState::Initialized {
            debug!("Start ignored, batch queue is {:?}", self.state);
            return;
        }

        let Some(intake) = self.intake.take() else {
            error!("Intake receiver missing, batch queue cannot start");
            return;
        };

        let chunker = Chunker::new(
            intake,
            self.close.clone(),
            self.config.max_batch_size,
            self.config.flush_interval,
        );
        self.consumption = Some(tokio::spawn(consume(
            chunker,
            self.dispatcher.clone(),
            self.config.await_in_flight_on_shutdown,
        )));
        self.state = QueueState::Running;
        debug!(
            "Batch queue running: max_batch_size={} flush_interval={:?} max_per_request={}",
            self.config.max_batch_size, self.config.flush_interval, self.config.max_per_request
        );
    }

    fn begin_shutdown(&mut self) {
        self.close.cancel();
        self.state = QueueState::ShuttingDown;
        debug!("Batch queue shutting down");
    }

    /// A consumption task that did not drain the intake means buffered
    /// entries were lost, so it never counts as a completed shutdown.
    #[allow(clippy::panic)]
    fn finish_consumption(&mut self, result: Result<(), JoinError>) {
        if let Err(e) = result {
            error!(
                "Batch consumption task failed while queue was {:?}: {e}",
                self.state
            );
            panic!("batch consumption task failed: {e}");
        }
        self.complete_shutdown();
    }

    #[allow(clippy::panic)]
    fn complete_shutdown(&mut self) {
        if self.state != QueueState::ShuttingDown {
            error!(
                "Batch consumption ended while queue was {:?}, expected ShuttingDown",
                self.state
            );
            panic!(
                "batch queue reached ShutDown from {:?} instead of ShuttingDown",
                self.state
            );
        }

        self.state = QueueState::ShutDown;
        let n_waiters = self.waiters.len();
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(());
        }
        debug!("Batch queue shut down, released {n_waiters} waiters");
    }
}

async fn join_consumption(consumption: &mut Option<JoinHandle<()>>) -> Result<(), JoinError> {
    match consumption {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

/// Pulls batches until the intake is drained, handing each non-empty batch
/// to its own dispatch task.
async fn consume<T: Send + 'static>(
    mut chunker: Chunker<T>,
    dispatcher: Dispatcher<T>,
    await_in_flight: bool,
) {
    let mut in_flight = JoinSet::new();

    while let Some((batch, reason)) = chunker.next_batch_with_reason().await {
        if batch.is_empty() {
            trace!("Nothing to flush on {}", reason.as_str());
            continue;
        }

        debug!(
            "Flushing batch of {} entries on {}",
            batch.len(),
            reason.as_str()
        );
        let dispatcher = dispatcher.clone();
        in_flight.spawn(async move { dispatcher.dispatch(batch).await });

        while let Some(result) = in_flight.try_join_next() {
            log_dispatch_result(result);
        }
    }

    if await_in_flight {
        while let Some(result) = in_flight.join_next().await {
            log_dispatch_result(result);
        }
    } else {
        debug!("Leaving {} dispatch tasks in flight", in_flight.len());
        in_flight.detach_all();
    }
}

fn log_dispatch_result(result: Result<DispatchSummary, JoinError>) {
    match result {
        Ok(summary) if summary.failed > 0 => debug!(
            "Dispatched batch with {} of {} sub-batches dropped",
            summary.failed,
            summary.sent + summary.failed
        ),
        Ok(_) => {}
        Err(e) => error!("Failed to join dispatch task: {e}"),
    }
}
