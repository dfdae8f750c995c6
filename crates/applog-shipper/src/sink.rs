// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use tracing::debug;

use crate::error::{ConfigError, PushError};
use crate::record::IngestionRecord;

const TENANT_HEADER: &str = "x-scope-orgid";

#[async_trait]
pub trait LogSink {
    async fn push(&self, record: &IngestionRecord) -> Result<(), PushError>;
}

#[derive(Clone)]
pub struct BasicAuth {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Pushes records to a Loki `/loki/api/v1/push` endpoint.
#[derive(Debug, Clone)]
pub struct LokiSink {
    client: reqwest::Client,
    url: String,
    auth: Option<BasicAuth>,
    headers: HeaderMap,
}

impl LokiSink {
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        tenant_id: &str,
        auth: Option<BasicAuth>,
    ) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let tenant = HeaderValue::from_str(tenant_id).map_err(|e| ConfigError::Invalid {
            name: "LOKI_TENANT_ID",
            reason: e.to_string(),
        })?;
        headers.insert(HeaderName::from_static(TENANT_HEADER), tenant);

        Ok(Self {
            client,
            url: url.into(),
            auth,
            headers,
        })
    }
}

#[async_trait]
impl LogSink for LokiSink {
    async fn push(&self, record: &IngestionRecord) -> Result<(), PushError> {
        let mut request = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .json(record);
        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.user, Some(&auth.password));
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            debug!("Successfully pushed {} log lines", record.line_count());
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(PushError::Status { status, body })
    }
}
