// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Incremental log shipping from DigitalOcean App Platform to Loki.
//!
//! App Platform only exposes the current log buffer of a component, so every
//! poll returns the full line set. This crate works out which of those lines
//! are new since the previous poll, splits them into bounded batches and
//! pushes each batch to a Loki push endpoint.
//!
//! ```text
//!   Scheduler ──> Forwarder ──> LogSource (App Platform)
//!                     │
//!                     ├──> DeltaTracker ──> StateStore
//!                     ├──> batch::partition
//!                     ├──> record::build
//!                     └──> LogSink (Loki)
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod batch;
pub mod config;
pub mod constants;
pub mod delta;
pub mod error;
pub mod forwarder;
pub mod http;
pub mod record;
pub mod scheduler;
pub mod sink;
pub mod source;
pub mod target;
pub mod timestamp;

#[cfg(test)]
mod test_support;
