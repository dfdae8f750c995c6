// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory collaborators for unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;

use crate::error::{FetchError, PushError};
use crate::record::IngestionRecord;
use crate::sink::LogSink;
use crate::source::LogSource;
use crate::target::{LogType, Target, TargetKey};

pub enum Poll {
    Lines(Vec<String>),
    /// Cancels the token while the poll is being served, then returns the lines.
    LinesAndCancel(Vec<String>, CancellationToken),
    Fail,
    Panic,
}

/// Serves scripted polls per target; an exhausted script repeats its last poll.
#[derive(Default)]
pub struct ScriptedSource {
    polls: Mutex<HashMap<TargetKey, VecDeque<Poll>>>,
    pub calls: Mutex<Vec<TargetKey>>,
}

impl ScriptedSource {
    pub fn script(&self, target: &Target, polls: Vec<Poll>) {
        self.polls
            .lock()
            .unwrap()
            .insert(target.key(), polls.into());
    }
}

pub fn lines(range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|i| format!("line {i}")).collect()
}

#[async_trait]
impl LogSource for ScriptedSource {
    async fn fetch_raw_lines(
        &self,
        target: &Target,
        _log_type: LogType,
    ) -> Result<Vec<String>, FetchError> {
        self.calls.lock().unwrap().push(target.key());
        let poll = {
            let mut polls = self.polls.lock().unwrap();
            let script = polls.entry(target.key()).or_default();
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().map(|poll| match poll {
                    Poll::Lines(lines) => Poll::Lines(lines.clone()),
                    Poll::LinesAndCancel(lines, token) => {
                        Poll::LinesAndCancel(lines.clone(), token.clone())
                    }
                    Poll::Fail => Poll::Fail,
                    Poll::Panic => Poll::Panic,
                })
            }
        };
        match poll {
            Some(Poll::Lines(lines)) => Ok(lines),
            Some(Poll::LinesAndCancel(lines, token)) => {
                token.cancel();
                Ok(lines)
            }
            Some(Poll::Panic) => panic!("scripted panic for {target}"),
            Some(Poll::Fail) | None => Err(FetchError::Decode("scripted failure".to_string())),
        }
    }
}

/// Records every push; pushes whose 1-based index is in `failing` are rejected.
#[derive(Default)]
pub struct RecordingSink {
    pub failing: HashSet<usize>,
    pub attempts: Mutex<usize>,
    pub accepted: Mutex<Vec<IngestionRecord>>,
}

impl RecordingSink {
    pub fn failing(indexes: &[usize]) -> Self {
        Self {
            failing: indexes.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn accepted(&self) -> Vec<IngestionRecord> {
        self.accepted.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl LogSink for RecordingSink {
    async fn push(&self, record: &IngestionRecord) -> Result<(), PushError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            *attempts += 1;
            *attempts
        };
        if self.failing.contains(&attempt) {
            return Err(PushError::Status {
                status: StatusCode::TOO_MANY_REQUESTS,
                body: "Ingestion rate limit exceeded".to_string(),
            });
        }
        self.accepted.lock().unwrap().push(record.clone());
        Ok(())
    }
}
