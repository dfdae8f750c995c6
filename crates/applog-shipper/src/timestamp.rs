// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Extraction of the RFC 3339 timestamp App Platform embeds in each line.
//!
//! A line such as `web 2025-10-27T19:50:32.682366470Z GET /health 200` is
//! turned into the display timestamp `2025-10-27 19:50:32` and the body
//! `web GET /health 200`. Lines without a recognizable timestamp are left
//! untouched.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

const TIMESTAMP_PATTERN: &str = r"[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}\.[0-9]+Z";
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// `YYYY-MM-DD HH:MM:SS` in UTC, `None` when nothing was extracted.
    pub timestamp: Option<String>,
    pub body: String,
}

impl Normalized {
    /// Text shipped to the sink: `[timestamp] body`, or the untouched line.
    #[must_use]
    pub fn into_text(self) -> String {
        match self.timestamp {
            Some(timestamp) if self.body.is_empty() => format!("[{timestamp}]"),
            Some(timestamp) => format!("[{timestamp}] {}", self.body),
            None => self.body,
        }
    }
}

fn timestamp_regex() -> Option<&'static Regex> {
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    REGEX
        .get_or_init(|| Regex::new(TIMESTAMP_PATTERN).ok())
        .as_ref()
}

/// Pulls the first embedded timestamp out of `line`.
///
/// Never fails: if the token is missing or does not parse, the line comes
/// back verbatim with `timestamp: None`.
#[must_use]
pub fn normalize(line: &str) -> Normalized {
    let passthrough = || Normalized {
        timestamp: None,
        body: line.to_string(),
    };

    let Some(found) = timestamp_regex().and_then(|regex| regex.find(line)) else {
        return passthrough();
    };

    let parsed = match DateTime::parse_from_rfc3339(found.as_str()) {
        Ok(parsed) => parsed.with_timezone(&Utc),
        Err(e) => {
            tracing::debug!("Leaving line as is, bad timestamp {}: {e}", found.as_str());
            return passthrough();
        }
    };

    let raw_before = &line[..found.start()];
    let raw_after = &line[found.end()..];
    let before = raw_before.trim_end();
    let after = raw_after.trim_start();
    // A token glued to text on both sides leaves no gap to collapse.
    let spaced = before.len() < raw_before.len() || after.len() < raw_after.len();
    let body = match (before.is_empty(), after.is_empty()) {
        (true, _) => after.to_string(),
        (false, true) => before.to_string(),
        (false, false) if spaced => format!("{before} {after}"),
        (false, false) => format!("{before}{after}"),
    };

    Normalized {
        timestamp: Some(parsed.format(DISPLAY_FORMAT).to_string()),
        body: body.trim().to_string(),
    }
}
