// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Drives the forwarder over every target, once per interval, until
//! cancelled.
//!
//! Targets run one after the other. Each one runs in its own task that is
//! awaited before the next starts, so a panic while handling one target is
//! logged and the cycle carries on with the others.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument, Span};

use crate::forwarder::{ForwardSummary, Forwarder};
use crate::target::Target;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Targets not visited because cancellation arrived mid-cycle.
    pub skipped: usize,
    pub lines_sent: usize,
}

pub struct Scheduler {
    forwarder: Arc<Forwarder>,
    targets: Vec<Target>,
    interval: Duration,
    cancel_token: CancellationToken,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        forwarder: Arc<Forwarder>,
        targets: Vec<Target>,
        interval: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            forwarder,
            targets,
            interval,
            cancel_token,
        }
    }

    /// Runs cycles until the token is cancelled. Returns the number of
    /// completed cycles.
    pub async fn run(&self) -> usize {
        info!(
            "Starting log forwarding for {} target(s) every {}s",
            self.targets.len(),
            self.interval.as_secs_f64()
        );
        for target in &self.targets {
            info!("  {target} ({})", target.key());
        }

        let mut cycles = 0;
        while !self.cancel_token.is_cancelled() {
            self.run_cycle().await;
            cycles += 1;

            debug!("Waiting {}s until next cycle", self.interval.as_secs_f64());
            tokio::select! {
                () = self.cancel_token.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Stopping log forwarder after {cycles} cycle(s)");
        cycles
    }

    /// Forwards every target once.
    pub async fn run_cycle(&self) -> CycleReport {
        info!("Starting collection cycle for {} target(s)", self.targets.len());
        let mut report = CycleReport::default();

        for (index, target) in self.targets.iter().enumerate() {
            if self.cancel_token.is_cancelled() {
                report.skipped = self.targets.len() - index;
                warn!("Cancelled mid-cycle, skipping {} target(s)", report.skipped);
                break;
            }

            let forwarder = Arc::clone(&self.forwarder);
            let task_target = target.clone();
            let handle = tokio::spawn(
                async move { forwarder.forward(&task_target).await }.instrument(Span::current()),
            );

            match handle.await {
                Ok(Ok(summary)) => {
                    report.succeeded += 1;
                    if let ForwardSummary::Delivered(delivery) = summary {
                        report.lines_sent += delivery.lines_sent;
                    }
                }
                Ok(Err(e)) => {
                    // Detail was already logged by the forwarder.
                    report.failed += 1;
                    debug!("{target} | Target failed this cycle: {e}");
                }
                Err(e) => {
                    report.failed += 1;
                    error!("{target} | Unexpected error while forwarding: {e}");
                }
            }
        }

        info!(
            "Cycle finished: {} target(s) ok, {} failed, {} skipped, {} line(s) sent",
            report.succeeded, report.failed, report.skipped, report.lines_sent
        );
        report
    }
}
