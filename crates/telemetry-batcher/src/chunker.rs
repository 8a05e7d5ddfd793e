// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Turns the unbounded intake into count- or time-bounded batches.
//!
//! A batch closes when it holds `max_batch_size` entries or when
//! `flush_interval` has elapsed since the previous close, whichever comes
//! first. A time-triggered close with nothing buffered yields an empty batch.
//!
//! Cancelling the close token closes the intake: entries already buffered
//! are drained into final batches and the sequence ends.

use crate::entry::Entry;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Size,
    Interval,
    Shutdown,
}

impl CloseReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Interval => "interval",
            Self::Shutdown => "shutdown",
        }
    }
}

pub struct Chunker<T> {
    intake: mpsc::UnboundedReceiver<Entry<T>>,
    close: CancellationToken,
    max_batch_size: usize,
    flush_interval: Duration,
    last_close: Instant,
    draining: bool,
    exhausted: bool,
}

impl<T> Chunker<T> {
    pub fn new(
        intake: mpsc::UnboundedReceiver<Entry<T>>,
        close: CancellationToken,
        max_batch_size: usize,
        flush_interval: Duration,
    ) -> Self {
        Chunker {
            intake,
            close,
            max_batch_size: max_batch_size.max(1),
            flush_interval,
            last_close: Instant::now(),
            draining: false,
            exhausted: false,
        }
    }

    /// Waits for the next batch to close. Returns `None` once the intake has
    /// been closed and fully drained.
    pub async fn next_batch(&mut self) -> Option<Vec<Entry<T>>> {
        self.next_batch_with_reason()
            .await
            .map(|(batch, _reason)| batch)
    }

    pub async fn next_batch_with_reason(&mut self) -> Option<(Vec<Entry<T>>, CloseReason)> {
        if self.exhausted {
            return None;
        }

        let deadline = self
            .last_close
            .checked_add(self.flush_interval)
            .unwrap_or_else(far_future);
        let mut batch = Vec::with_capacity(self.max_batch_size.min(1024));

        loop {
            if self.draining {
                let received = self.intake.recv().await;
                if let Some(closed) = self.accept(&mut batch, received) {
                    return Some(closed);
                }
                continue;
            }

            tokio::select! {
                received = self.intake.recv() => {
                    if let Some(closed) = self.accept(&mut batch, received) {
                        return Some(closed);
                    }
                }
                _ = self.close.cancelled() => {
                    debug!("Closing intake with {} entries in the open batch", batch.len());
                    self.intake.close();
                    self.draining = true;
                }
                _ = sleep_until(deadline) => {
                    return Some(self.close_batch(batch, CloseReason::Interval));
                }
            }
        }
    }

    /// Adds a received entry to the open batch, closing it when full. The end
    /// of the intake closes whatever is buffered.
    fn accept(
        &mut self,
        batch: &mut Vec<Entry<T>>,
        received: Option<Entry<T>>,
    ) -> Option<(Vec<Entry<T>>, CloseReason)> {
        match received {
            Some(entry) => {
                batch.push(entry);
                if batch.len() >= self.max_batch_size {
                    Some(self.close_batch(std::mem::take(batch), CloseReason::Size))
                } else {
                    None
                }
            }
            None => {
                self.exhausted = true;
                Some(self.close_batch(std::mem::take(batch), CloseReason::Shutdown))
            }
        }
    }

    fn close_batch(
        &mut self,
        batch: Vec<Entry<T>>,
        reason: CloseReason,
    ) -> (Vec<Entry<T>>, CloseReason) {
        self.last_close = Instant::now();
        trace!(
            "Closed batch of {} entries on {}",
            batch.len(),
            reason.as_str()
        );
        (batch, reason)
    }
}

// Roughly 30 years, used when the interval does not fit in an `Instant`.
fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86400 * 365 * 30)
}
