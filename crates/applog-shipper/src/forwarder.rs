// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One target's trip through the pipeline:
//!
//! ```text
//!   fetch ──> delta ──> partition ──> build ──> push (per batch)
//! ```
//!
//! A failed batch does not stop the remaining batches of the same delta. The
//! target counts as delivered as soon as one batch made it.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::{debug, error, info};

use crate::batch::{batch_count, partition};
use crate::delta::DeltaTracker;
use crate::error::ForwardError;
use crate::record;
use crate::sink::LogSink;
use crate::source::LogSource;
use crate::target::{LogType, Target};

#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    pub log_type: LogType,
    pub batch_size: NonZeroUsize,
    /// Sleep between two pushes of the same delta.
    pub batch_pause: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleReason {
    /// The source returned no lines at all.
    EmptyFetch,
    /// Lines were returned but none are new.
    NoNewLines,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub new_lines: usize,
    pub lines_sent: usize,
    pub batches_sent: usize,
    pub batches_failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardSummary {
    NothingToDo(IdleReason),
    Delivered(DeliveryReport),
}

pub struct Forwarder {
    source: Arc<dyn LogSource + Send + Sync>,
    sink: Arc<dyn LogSink + Send + Sync>,
    tracker: DeltaTracker,
    config: ForwarderConfig,
}

impl Forwarder {
    #[must_use]
    pub fn new(
        source: Arc<dyn LogSource + Send + Sync>,
        sink: Arc<dyn LogSink + Send + Sync>,
        tracker: DeltaTracker,
        config: ForwarderConfig,
    ) -> Self {
        Self {
            source,
            sink,
            tracker,
            config,
        }
    }

    #[must_use]
    pub fn tracker(&self) -> &DeltaTracker {
        &self.tracker
    }

    pub async fn forward(&self, target: &Target) -> Result<ForwardSummary, ForwardError> {
        debug!("{target} | Fetching {} logs", self.config.log_type);

        let lines = match self
            .source
            .fetch_raw_lines(target, self.config.log_type)
            .await
        {
            Ok(lines) => lines,
            Err(e) => {
                error!("{target} | Failed to fetch logs: {e}");
                return Err(ForwardError::Fetch(e));
            }
        };

        if lines.is_empty() {
            info!("{target} | No log lines returned");
            return Ok(ForwardSummary::NothingToDo(IdleReason::EmptyFetch));
        }

        let fetched = lines.len();
        let delta = self.tracker.observe(&target.key(), lines);
        if delta.is_empty() {
            info!("{target} | No new log lines ({fetched} fetched, {:?})", delta.kind);
            return Ok(ForwardSummary::NothingToDo(IdleReason::NoNewLines));
        }

        let total_batches = batch_count(delta.lines.len(), self.config.batch_size);
        info!(
            "{target} | Found {} new log lines ({:?}), sending in {total_batches} batch(es)",
            delta.lines.len(),
            delta.kind
        );

        let mut report = DeliveryReport {
            new_lines: delta.lines.len(),
            ..DeliveryReport::default()
        };
        let mut last_error = None;

        for (index, batch) in partition(&delta.lines, self.config.batch_size).enumerate() {
            if index > 0 && !self.config.batch_pause.is_zero() {
                tokio::time::sleep(self.config.batch_pause).await;
            }

            let record = record::build(batch, target, SystemTime::now());
            match self.sink.push(&record).await {
                Ok(()) => {
                    report.batches_sent += 1;
                    report.lines_sent += batch.len();
                    debug!(
                        "{target} | Pushed batch {}/{total_batches} ({} lines)",
                        index + 1,
                        batch.len()
                    );
                }
                Err(e) => {
                    report.batches_failed += 1;
                    error!(
                        "{target} | Failed to push batch {}/{total_batches} ({} lines): {e}",
                        index + 1,
                        batch.len()
                    );
                    last_error = Some(e);
                }
            }
        }

        if report.batches_sent == 0 {
            if let Some(last) = last_error {
                return Err(ForwardError::AllBatchesFailed {
                    batches: report.batches_failed,
                    last,
                });
            }
        }

        info!(
            "{target} | Sent {}/{} lines, {} batch(es) sent, {} failed",
            report.lines_sent, report.new_lines, report.batches_sent, report.batches_failed
        );
        Ok(ForwardSummary::Delivered(report))
    }
}
