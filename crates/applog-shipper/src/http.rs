// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Shared reqwest client for the App Platform and Loki collaborators.
//!
//! Every request gets the configured timeout, so a hung upstream or sink
//! turns into an ordinary fetch/push error instead of stalling the cycle.

use std::error::Error;
use std::time::Duration;

use tracing::error;

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub https_proxy: Option<String>,
}

/// Builds the client, falling back to a direct connection when the proxy
/// settings are unusable.
#[must_use]
pub fn get_client(options: &ClientOptions) -> reqwest::Client {
    match build_client(options, true) {
        Ok(client) => client,
        Err(e) => {
            error!(
                "Unable to parse proxy configuration: {}, falling back to direct connection",
                e
            );
            match build_client(options, false) {
                Ok(client) => client,
                Err(inner) => {
                    error!(
                        "Failed to build HTTP client without proxy: {}, using reqwest defaults",
                        inner
                    );
                    reqwest::Client::new()
                }
            }
        }
    }
}

fn build_client(
    options: &ClientOptions,
    allow_proxy: bool,
) -> Result<reqwest::Client, Box<dyn Error>> {
    let mut builder = reqwest::Client::builder()
        .timeout(options.timeout)
        .connect_timeout(options.timeout)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_keepalive(Some(Duration::from_secs(60)));

    if allow_proxy {
        if let Some(proxy) = options.https_proxy.as_deref() {
            builder = builder.proxy(reqwest::Proxy::https(proxy)?);
        }
    }

    Ok(builder.build()?)
}
