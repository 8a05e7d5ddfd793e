// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batching submission queue for high-frequency telemetry records.
//!
//! Producers call [`BatchQueueHandle::submit`] from anywhere. Entries are
//! grouped into batches that close on a count or time trigger, split per
//! partition key, and handed to a downstream [`Sink`].
//!
//! ```text
//!   submit ──> intake ──> Chunker ──> partition ──> Dispatcher ──> Sink
//!                            ^
//!                            │ start / shutdown
//!                     BatchQueueService (lifecycle actor)
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod chunker;
pub mod config;
pub mod dispatcher;
pub mod entry;
pub mod errors;
pub mod partitioner;
pub mod queue_service;

pub use config::BatchQueueConfig;
pub use dispatcher::Sink;
pub use entry::Entry;
pub use errors::{ConfigError, QueueError, SinkError};
pub use queue_service::{BatchQueueHandle, BatchQueueService, QueueState};
