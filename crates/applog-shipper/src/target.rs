// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

/// Identity of a monitored component, used as the delta tracker key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetKey {
    pub source_id: String,
    pub component_id: String,
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source_id, self.component_id)
    }
}

/// One App Platform component whose logs are shipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// App Platform app id.
    pub source_id: String,
    /// Component name inside the app.
    pub component_id: String,
    /// Human readable app name, may be empty.
    pub display_name: String,
}

impl Target {
    pub fn new(
        source_id: impl Into<String>,
        component_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            component_id: component_id.into(),
            display_name: display_name.into(),
        }
    }

    #[must_use]
    pub fn key(&self) -> TargetKey {
        TargetKey {
            source_id: self.source_id.clone(),
            component_id: self.component_id.clone(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.display_name.is_empty() {
            &self.source_id
        } else {
            &self.display_name
        };
        write!(f, "{name}/{}", self.component_id)
    }
}

/// Which App Platform log stream to read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogType {
    Build,
    Deploy,
    #[default]
    Run,
    RunRestarted,
}

impl LogType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::Build => "BUILD",
            LogType::Deploy => "DEPLOY",
            LogType::Run => "RUN",
            LogType::RunRestarted => "RUN_RESTARTED",
        }
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUILD" => Ok(LogType::Build),
            "DEPLOY" => Ok(LogType::Deploy),
            "RUN" => Ok(LogType::Run),
            "RUN_RESTARTED" => Ok(LogType::RunRestarted),
            other => Err(format!(
                "unknown log type '{other}', expected one of BUILD, DEPLOY, RUN, RUN_RESTARTED"
            )),
        }
    }
}
