// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Number of trailing lines hashed into a line set signature.
pub const SIGNATURE_WINDOW: usize = 50;

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause between two pushes of the same delta, keeps us under Loki's
/// per-tenant ingestion rate limit on large backlogs.
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_millis(500);

pub const DEFAULT_API_URL: &str = "https://api.digitalocean.com";
pub const DEFAULT_TENANT_ID: &str = "fake";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Display name given to the target in single-app mode.
pub const SINGLE_TARGET_NAME: &str = "default";

pub const SOURCE_LABEL_VALUE: &str = "digitalocean_app_platform";
pub const JOB_LABEL_VALUE: &str = "app_logs";
