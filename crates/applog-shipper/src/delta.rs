// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Detection of the lines added since the previous poll of a target.
//!
//! App Platform returns the whole current log buffer on every poll. For each
//! target we remember how many lines the last poll returned and a SHA-256
//! signature of its last [`SIGNATURE_WINDOW`] lines, then compare:
//!
//! | stored state      | new poll                   | delta                    |
//! |-------------------|----------------------------|--------------------------|
//! | none              | any                        | nothing (no backfill)    |
//! | `sig`, `n`        | same `sig`, `n` lines      | nothing                  |
//! | `sig`, `n`        | `m > n` lines              | `lines[n..]`             |
//! | `sig`, `n`        | `m < n` lines              | everything (restart)     |
//! | `sig`, `n`        | other `sig`, `n` lines     | last window (rotation)   |
//!
//! This is a heuristic: a collision, or a rewrite outside the window, can
//! cause missed or repeated lines.

use std::collections::HashMap;
use std::sync::Mutex;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::constants::SIGNATURE_WINDOW;
use crate::target::TargetKey;

/// What the tracker remembers about a target between polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerState {
    pub last_signature: String,
    pub last_count: usize,
}

/// Storage for per-target tracker state.
///
/// Implementations must be safe to share between tasks; the tracker never
/// holds a value across an await point.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &TargetKey) -> Option<TrackerState>;
    fn put(&self, key: TargetKey, state: TrackerState);
}

/// Process-lifetime state. Lost on restart, which together with first poll
/// suppression means a restart never replays old logs.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    states: Mutex<HashMap<TargetKey, TrackerState>>,
}

impl StateStore for InMemoryStateStore {
    fn get(&self, key: &TargetKey) -> Option<TrackerState> {
        match self.states.lock() {
            Ok(states) => states.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        }
    }

    fn put(&self, key: TargetKey, state: TrackerState) {
        match self.states.lock() {
            Ok(mut states) => {
                states.insert(key, state);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(key, state);
            }
        }
    }
}

/// Which comparison branch produced a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaKind {
    FirstObservation,
    Unchanged,
    Appended,
    Restarted,
    Rotated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    pub kind: DeltaKind,
    pub lines: Vec<String>,
}

impl Delta {
    fn empty(kind: DeltaKind) -> Self {
        Self {
            kind,
            lines: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Hex SHA-256 of the last `SIGNATURE_WINDOW` lines joined by newlines.
#[must_use]
pub fn signature(lines: &[String]) -> String {
    let window = &lines[lines.len().saturating_sub(SIGNATURE_WINDOW)..];
    let mut hasher = Sha256::new();
    for (i, line) in window.iter().enumerate() {
        if i > 0 {
            hasher.update(b"\n");
        }
        hasher.update(line.as_bytes());
    }
    hex::encode(hasher.finalize())
}

pub struct DeltaTracker {
    store: Box<dyn StateStore>,
}

impl Default for DeltaTracker {
    fn default() -> Self {
        Self::new(Box::new(InMemoryStateStore::default()))
    }
}

impl DeltaTracker {
    #[must_use]
    pub fn new(store: Box<dyn StateStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn state(&self, key: &TargetKey) -> Option<TrackerState> {
        self.store.get(key)
    }

    /// Consumes the full line set of one poll and returns the lines judged new.
    pub fn observe(&self, key: &TargetKey, mut lines: Vec<String>) -> Delta {
        let current = TrackerState {
            last_signature: signature(&lines),
            last_count: lines.len(),
        };

        let Some(previous) = self.store.get(key) else {
            debug!(
                "{key} | First observation with {} lines, skipping backfill",
                current.last_count
            );
            self.store.put(key.clone(), current);
            return Delta::empty(DeltaKind::FirstObservation);
        };

        if previous == current {
            return Delta::empty(DeltaKind::Unchanged);
        }

        let delta = if current.last_count > previous.last_count {
            Delta {
                kind: DeltaKind::Appended,
                lines: lines.split_off(previous.last_count),
            }
        } else if current.last_count < previous.last_count {
            warn!(
                "{key} | Log buffer shrank from {} to {} lines, assuming restart and resending it",
                previous.last_count, current.last_count
            );
            Delta {
                kind: DeltaKind::Restarted,
                lines,
            }
        } else {
            debug!(
                "{key} | Content changed at constant size {}, resending last {SIGNATURE_WINDOW} lines",
                current.last_count
            );
            let start = lines.len().saturating_sub(SIGNATURE_WINDOW);
            Delta {
                kind: DeltaKind::Rotated,
                lines: lines.split_off(start),
            }
        };

        self.store.put(key.clone(), current);
        delta
    }
}
