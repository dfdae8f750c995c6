// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Startup configuration, read once from the environment.
//!
//! Empty variables count as unset. Every problem is reported as a
//! [`ConfigError`] before anything is fetched or pushed.

use std::collections::HashSet;
use std::env;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::level_filters::LevelFilter;

use crate::constants::{
    DEFAULT_API_URL, DEFAULT_BATCH_PAUSE, DEFAULT_BATCH_SIZE, DEFAULT_HTTP_TIMEOUT,
    DEFAULT_INTERVAL, DEFAULT_LOG_LEVEL, DEFAULT_TENANT_ID, SINGLE_TARGET_NAME,
};
use crate::delta::DeltaTracker;
use crate::error::ConfigError;
use crate::forwarder::{Forwarder, ForwarderConfig};
use crate::http::{get_client, ClientOptions};
use crate::sink::{BasicAuth, LokiSink};
use crate::source::AppPlatformSource;
use crate::target::{LogType, Target};

#[derive(Clone)]
pub struct Config {
    pub api_token: String,
    pub api_url: String,
    pub loki_url: String,
    pub loki_auth: Option<BasicAuth>,
    pub tenant_id: String,
    pub targets: Vec<Target>,
    pub interval: Duration,
    pub log_type: LogType,
    pub batch_size: NonZeroUsize,
    pub batch_pause: Duration,
    pub http_timeout: Duration,
    pub https_proxy: Option<String>,
    pub log_level: LevelFilter,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("loki_url", &self.loki_url)
            .field("loki_auth", &self.loki_auth)
            .field("tenant_id", &self.tenant_id)
            .field("targets", &self.targets)
            .field("interval", &self.interval)
            .field("log_type", &self.log_type)
            .field("batch_size", &self.batch_size)
            .field("batch_pause", &self.batch_pause)
            .field("http_timeout", &self.http_timeout)
            .field("https_proxy", &self.https_proxy)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any name -> value lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        let api_token = required("DO_TOKEN")?;
        let loki_url = required("LOKI_URL")?;

        let targets = if let Some(apps) = var("APPS_CONFIG") {
            parse_targets(&apps)?
        } else if let (Some(app_id), Some(component)) = (var("APP_ID"), var("COMPONENT_NAME")) {
            vec![Target::new(app_id, component, SINGLE_TARGET_NAME)]
        } else {
            return Err(ConfigError::NoTargets);
        };

        let loki_auth = var("LOKI_USER").map(|user| BasicAuth {
            user,
            password: var("LOKI_PASSWORD").unwrap_or_default(),
        });

        let interval = match var("INTERVAL") {
            Some(value) => Duration::from_secs(parse_positive("INTERVAL", &value)?),
            None => DEFAULT_INTERVAL,
        };
        let http_timeout = match var("HTTP_TIMEOUT_SECS") {
            Some(value) => Duration::from_secs(parse_positive("HTTP_TIMEOUT_SECS", &value)?),
            None => DEFAULT_HTTP_TIMEOUT,
        };
        let batch_size = var("BATCH_SIZE")
            .map(|value| parse_number::<usize>("BATCH_SIZE", &value))
            .transpose()?
            .unwrap_or(DEFAULT_BATCH_SIZE);
        let batch_size =
            NonZeroUsize::new(batch_size).ok_or_else(|| positive_error("BATCH_SIZE"))?;
        let batch_pause = match var("BATCH_PAUSE_MS") {
            Some(value) => Duration::from_millis(parse_number("BATCH_PAUSE_MS", &value)?),
            None => DEFAULT_BATCH_PAUSE,
        };

        let log_type = match var("LOG_TYPE") {
            Some(value) => LogType::from_str(&value).map_err(|reason| ConfigError::Invalid {
                name: "LOG_TYPE",
                reason,
            })?,
            None => LogType::default(),
        };

        let log_level = var("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let log_level = LevelFilter::from_str(&log_level).map_err(|_| ConfigError::Invalid {
            name: "LOG_LEVEL",
            reason: format!("'{log_level}' is not one of off, error, warn, info, debug, trace"),
        })?;

        Ok(Config {
            api_token,
            api_url: var("DO_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            loki_url,
            loki_auth,
            tenant_id: var("LOKI_TENANT_ID").unwrap_or_else(|| DEFAULT_TENANT_ID.to_string()),
            targets,
            interval,
            log_type,
            batch_size,
            batch_pause,
            http_timeout,
            https_proxy: var("HTTPS_PROXY"),
            log_level,
        })
    }

    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: self.http_timeout,
            https_proxy: self.https_proxy.clone(),
        }
    }

    #[must_use]
    pub fn forwarder_config(&self) -> ForwarderConfig {
        ForwarderConfig {
            log_type: self.log_type,
            batch_size: self.batch_size,
            batch_pause: self.batch_pause,
        }
    }

    /// Wires the App Platform source, the Loki sink and a fresh in-memory
    /// tracker into a forwarder sharing one HTTP client.
    pub fn build_forwarder(&self) -> Result<Forwarder, ConfigError> {
        let client = get_client(&self.client_options());
        let source = AppPlatformSource::new(client.clone(), &self.api_url, &self.api_token)?;
        let sink = LokiSink::new(
            client,
            self.loki_url.clone(),
            &self.tenant_id,
            self.loki_auth.clone(),
        )?;

        Ok(Forwarder::new(
            Arc::new(source),
            Arc::new(sink),
            DeltaTracker::default(),
            self.forwarder_config(),
        ))
    }
}

/// Parses `app_id:component[:name],...`. Blank entries are ignored.
pub fn parse_targets(apps: &str) -> Result<Vec<Target>, ConfigError> {
    let mut targets = Vec::new();
    let mut seen = HashSet::new();

    for entry in apps.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let mut parts = entry.splitn(3, ':').map(str::trim);
        let (Some(app_id), Some(component)) = (parts.next(), parts.next()) else {
            return Err(invalid_entry(entry));
        };
        if app_id.is_empty() || component.is_empty() {
            return Err(invalid_entry(entry));
        }

        let target = Target::new(app_id, component, parts.next().unwrap_or_default());
        if !seen.insert(target.key()) {
            return Err(ConfigError::DuplicateTarget(target.key()));
        }
        targets.push(target);
    }

    if targets.is_empty() {
        return Err(ConfigError::NoTargets);
    }
    Ok(targets)
}

fn invalid_entry(entry: &str) -> ConfigError {
    ConfigError::Invalid {
        name: "APPS_CONFIG",
        reason: format!("'{entry}' is not app_id:component[:name]"),
    }
}

fn parse_number<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| ConfigError::Invalid {
        name,
        reason: format!("'{value}': {e}"),
    })
}

fn parse_positive<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let number = parse_number::<T>(name, value)?;
    if number == T::default() {
        return Err(positive_error(name));
    }
    Ok(number)
}

fn positive_error(name: &'static str) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: "must be greater than 0".to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use duplicate::duplicate_item;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    const BASE: [(&str, &str); 3] = [
        ("DO_TOKEN", "dop_v1_secret"),
        ("LOKI_URL", "http://loki:3100/loki/api/v1/push"),
        ("APPS_CONFIG", "app-1:web:prod"),
    ];

    fn with_base(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        let mut vars = BASE.to_vec();
        vars.extend_from_slice(extra);
        vars
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&BASE)).unwrap();

        assert_eq!(config.api_url, "https://api.digitalocean.com");
        assert_eq!(config.tenant_id, "fake");
        assert!(config.loki_auth.is_none());
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.log_type, LogType::Run);
        assert_eq!(config.batch_size.get(), 1000);
        assert_eq!(config.batch_pause, Duration::from_millis(500));
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.https_proxy, None);
        assert_eq!(config.log_level, LevelFilter::INFO);
        assert_eq!(config.targets, vec![Target::new("app-1", "web", "prod")]);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&with_base(&[
            ("LOKI_USER", "loki"),
            ("LOKI_PASSWORD", "hunter2"),
            ("LOKI_TENANT_ID", "team-a"),
            ("INTERVAL", "15"),
            ("LOG_TYPE", "build"),
            ("BATCH_SIZE", "250"),
            ("BATCH_PAUSE_MS", "0"),
            ("HTTP_TIMEOUT_SECS", "5"),
            ("DO_API_URL", "http://localhost:8080"),
            ("HTTPS_PROXY", "http://proxy:3128"),
            ("LOG_LEVEL", "DEBUG"),
        ])))
        .unwrap();

        let auth = config.loki_auth.unwrap();
        assert_eq!(auth.user, "loki");
        assert_eq!(auth.password, "hunter2");
        assert_eq!(config.tenant_id, "team-a");
        assert_eq!(config.interval, Duration::from_secs(15));
        assert_eq!(config.log_type, LogType::Build);
        assert_eq!(config.batch_size.get(), 250);
        assert_eq!(config.batch_pause, Duration::ZERO);
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.https_proxy.as_deref(), Some("http://proxy:3128"));
        assert_eq!(config.log_level, LevelFilter::DEBUG);
    }

    #[duplicate_item(
        test_name                 missing;
        [test_missing_token]      ["DO_TOKEN"];
        [test_missing_loki_url]   ["LOKI_URL"];
    )]
    #[test]
    fn test_name() {
        let vars: Vec<_> = BASE.iter().copied().filter(|(k, _)| *k != missing).collect();
        let error = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(error, ConfigError::Missing(name) if name == missing));
    }

    #[test]
    fn test_blank_required_value_is_missing() {
        let error = Config::from_lookup(lookup(&with_base(&[("DO_TOKEN", "  ")]))).unwrap_err();
        assert!(matches!(error, ConfigError::Missing("DO_TOKEN")));
    }

    #[duplicate_item(
        test_name                       var_name              value;
        [test_zero_interval]            ["INTERVAL"]          ["0"];
        [test_unparsable_interval]      ["INTERVAL"]          ["soon"];
        [test_zero_batch_size]          ["BATCH_SIZE"]        ["0"];
        [test_negative_batch_size]      ["BATCH_SIZE"]        ["-5"];
        [test_zero_timeout]             ["HTTP_TIMEOUT_SECS"] ["0"];
        [test_unparsable_pause]         ["BATCH_PAUSE_MS"]    ["half a second"];
        [test_unknown_log_type]         ["LOG_TYPE"]          ["STDERR"];
        [test_unknown_log_level]        ["LOG_LEVEL"]         ["loud"];
    )]
    #[test]
    fn test_name() {
        let error = Config::from_lookup(lookup(&with_base(&[(var_name, value)]))).unwrap_err();
        match error {
            ConfigError::Invalid { name, .. } => assert_eq!(name, var_name),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_single_target_mode() {
        let config = Config::from_lookup(lookup(&[
            ("DO_TOKEN", "t"),
            ("LOKI_URL", "http://loki"),
            ("APP_ID", "app-9"),
            ("COMPONENT_NAME", "api"),
        ]))
        .unwrap();

        assert_eq!(config.targets, vec![Target::new("app-9", "api", "default")]);
    }

    #[test]
    fn test_apps_config_wins_over_single_target() {
        let config = Config::from_lookup(lookup(&with_base(&[
            ("APP_ID", "app-9"),
            ("COMPONENT_NAME", "api"),
        ])))
        .unwrap();

        assert_eq!(config.targets, vec![Target::new("app-1", "web", "prod")]);
    }

    #[test]
    fn test_no_targets() {
        let error = Config::from_lookup(lookup(&[
            ("DO_TOKEN", "t"),
            ("LOKI_URL", "http://loki"),
            ("APP_ID", "app-9"),
        ]))
        .unwrap_err();

        assert!(matches!(error, ConfigError::NoTargets));
    }

    #[test]
    fn test_parse_targets() {
        let targets =
            parse_targets(" app-1:web:prod , app-1:worker,, app-2 : api : staging ").unwrap();

        assert_eq!(
            targets,
            vec![
                Target::new("app-1", "web", "prod"),
                Target::new("app-1", "worker", ""),
                Target::new("app-2", "api", "staging"),
            ]
        );
    }

    #[test]
    fn test_parse_targets_keeps_colons_in_name() {
        let targets = parse_targets("app-1:web:prod:eu").unwrap();
        assert_eq!(targets[0].display_name, "prod:eu");
    }

    #[duplicate_item(
        test_name                        apps;
        [test_entry_without_component]   ["app-1"];
        [test_entry_with_empty_app]      [":web:prod"];
        [test_entry_with_empty_component] ["app-1::prod"];
    )]
    #[test]
    fn test_name() {
        let error = parse_targets(apps).unwrap_err();
        assert!(matches!(error, ConfigError::Invalid { name: "APPS_CONFIG", .. }));
    }

    #[test]
    fn test_parse_targets_only_separators() {
        assert!(matches!(parse_targets(" , ,"), Err(ConfigError::NoTargets)));
    }

    #[test]
    fn test_duplicate_target() {
        let error = parse_targets("app-1:web:prod,app-1:web:other").unwrap_err();
        match error {
            ConfigError::DuplicateTarget(key) => assert_eq!(key.to_string(), "app-1/web"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::from_lookup(lookup(&with_base(&[
            ("LOKI_USER", "loki"),
            ("LOKI_PASSWORD", "hunter2"),
        ])))
        .unwrap();

        let debug = format!("{config:?}");
        assert!(!debug.contains("dop_v1_secret"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("app-1"));
    }

    #[test]
    fn test_build_forwarder() {
        let config = Config::from_lookup(lookup(&BASE)).unwrap();
        assert!(config.build_forwarder().is_ok());

        let config =
            Config::from_lookup(lookup(&with_base(&[("LOKI_TENANT_ID", "bad\ntenant")]))).unwrap();
        assert!(matches!(
            config.build_forwarder(),
            Err(ConfigError::Invalid { name: "LOKI_TENANT_ID", .. })
        ));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        env::set_var("DO_TOKEN", "env-token");
        env::set_var("LOKI_URL", "http://loki:3100/loki/api/v1/push");
        env::set_var("APPS_CONFIG", "app-1:web:prod,app-2:api");
        env::set_var("INTERVAL", "30");

        let config = Config::from_env().unwrap();

        assert_eq!(config.api_token, "env-token");
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.interval, Duration::from_secs(30));

        env::remove_var("DO_TOKEN");
        env::remove_var("LOKI_URL");
        env::remove_var("APPS_CONFIG");
        env::remove_var("INTERVAL");
    }

    #[test]
    #[serial]
    fn test_from_env_missing_token() {
        env::remove_var("DO_TOKEN");
        env::set_var("LOKI_URL", "http://loki");

        let error = Config::from_env().unwrap_err();

        assert!(matches!(error, ConfigError::Missing("DO_TOKEN")));
        env::remove_var("LOKI_URL");
    }
}
