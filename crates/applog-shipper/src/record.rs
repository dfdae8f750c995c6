// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Loki push API payloads.
//!
//! ```json
//! {"streams":[{"stream":{"app_id":"…","component":"web",…},
//!              "values":[["1730058632682366470","[2025-10-27 19:50:32] GET /"]]}]}
//! ```

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::constants::{JOB_LABEL_VALUE, SOURCE_LABEL_VALUE};
use crate::target::Target;
use crate::timestamp::normalize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionRecord {
    pub streams: Vec<Stream>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stream {
    #[serde(rename = "stream")]
    pub labels: BTreeMap<String, String>,
    /// `(nanoseconds since epoch as decimal string, line)` pairs.
    pub values: Vec<(String, String)>,
}

impl IngestionRecord {
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.streams.iter().map(|stream| stream.values.len()).sum()
    }
}

#[must_use]
pub fn labels(target: &Target) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app_id".to_string(), target.source_id.clone()),
        ("component".to_string(), target.component_id.clone()),
        ("app_name".to_string(), target.display_name.clone()),
        ("source".to_string(), SOURCE_LABEL_VALUE.to_string()),
        ("job".to_string(), JOB_LABEL_VALUE.to_string()),
    ])
}

/// Builds one push payload for `batch`.
///
/// Entries are stamped with the delivery time, not the original log time,
/// offset by their index so timestamps strictly increase within the stream.
/// The original time is kept in the text as `[YYYY-MM-DD HH:MM:SS]`.
#[must_use]
pub fn build(batch: &[String], target: &Target, delivered_at: SystemTime) -> IngestionRecord {
    let base_ns = delivered_at
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();

    let values = batch
        .iter()
        .zip(0u128..)
        .map(|(line, offset)| ((base_ns + offset).to_string(), normalize(line).into_text()))
        .collect();

    IngestionRecord {
        streams: vec![Stream {
            labels: labels(target),
            values,
        }],
    }
}
