// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Reading the current log buffer of an App Platform component.
//!
//! The logs endpoint does not return lines directly. It answers with a
//! short-lived `live_url` (and `historic_urls` for archived chunks) that has
//! to be fetched in a second request:
//!
//! ```text
//!   GET /v2/apps/{app}/components/{component}/logs?type=RUN&follow=false
//!     -> {"live_url": "https://…/logs?token=…", "historic_urls": [...]}
//!   GET live_url
//!     -> "line\nline\n…"
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ConfigError, FetchError};
use crate::target::{LogType, Target};

#[async_trait]
pub trait LogSource {
    /// Returns the full ordered line set currently held for `target`.
    async fn fetch_raw_lines(
        &self,
        target: &Target,
        log_type: LogType,
    ) -> Result<Vec<String>, FetchError>;
}

#[derive(Debug, Deserialize)]
struct LogsResponse {
    live_url: Option<String>,
    #[serde(default)]
    historic_urls: Vec<String>,
}

impl LogsResponse {
    fn stream_url(self) -> Option<String> {
        self.live_url
            .filter(|url| !url.is_empty())
            .or_else(|| self.historic_urls.into_iter().next_back())
    }
}

#[derive(Debug, Clone)]
pub struct AppPlatformSource {
    client: reqwest::Client,
    api_url: String,
    headers: HeaderMap,
}

impl AppPlatformSource {
    pub fn new(client: reqwest::Client, api_url: &str, token: &str) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        let mut bearer =
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| ConfigError::Invalid {
                name: "DO_TOKEN",
                reason: e.to_string(),
            })?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            headers,
        })
    }

    fn logs_url(&self, target: &Target) -> String {
        format!(
            "{}/v2/apps/{}/components/{}/logs",
            self.api_url, target.source_id, target.component_id
        )
    }

    async fn get_checked(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, FetchError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().path().to_string();
        let body = response.text().await.unwrap_or_default();
        Err(FetchError::Status { url, status, body })
    }
}

#[async_trait]
impl LogSource for AppPlatformSource {
    async fn fetch_raw_lines(
        &self,
        target: &Target,
        log_type: LogType,
    ) -> Result<Vec<String>, FetchError> {
        let request = self
            .client
            .get(self.logs_url(target))
            .headers(self.headers.clone())
            .query(&[("type", log_type.as_str()), ("follow", "false")]);
        let logs: LogsResponse = self
            .get_checked(request)
            .await?
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        let Some(stream_url) = logs.stream_url() else {
            debug!("{target} | No log stream URL in response");
            return Ok(Vec::new());
        };

        // The stream URL is pre-signed, the bearer token must not be forwarded.
        let body = self
            .get_checked(self.client.get(&stream_url))
            .await?
            .text()
            .await?;

        let lines: Vec<String> = body
            .trim()
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        debug!("{target} | Fetched {} lines", lines.len());
        Ok(lines)
    }
}
