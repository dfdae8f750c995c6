// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;

use crate::target::TargetKey;

/// Failure talking to App Platform.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{status} from {url}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Failure talking to Loki. Carries the response body when Loki sent one.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{status} from sink: {body}")]
    Status { status: StatusCode, body: String },
}

/// Invalid or missing startup configuration. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("No apps configured. Set either APPS_CONFIG or APP_ID+COMPONENT_NAME")]
    NoTargets,

    #[error("Target {0} is configured more than once")]
    DuplicateTarget(TargetKey),
}

/// Why one target's cycle produced nothing useful.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("failed to fetch logs: {0}")]
    Fetch(#[from] FetchError),

    #[error("all {batches} batches failed, last error: {last}")]
    AllBatchesFailed { batches: usize, last: PushError },
}
