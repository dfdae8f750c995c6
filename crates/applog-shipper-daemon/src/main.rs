// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use applog_shipper::config::Config;
use applog_shipper::scheduler::Scheduler;

const NOISY_TARGETS: &str = "h2=off,hyper=off,reqwest=off,rustls=off";

#[tokio::main]
pub async fn main() -> ExitCode {
    let config = Config::from_env();
    // An invalid configuration is still reported at the default level.
    init_logging(config.as_ref().map_or(LevelFilter::INFO, |config| config.log_level));

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Error loading configuration, log shipper will not start: {e}");
            return ExitCode::FAILURE;
        }
    };
    debug!("Loaded configuration: {config:?}");

    let forwarder = match config.build_forwarder() {
        Ok(forwarder) => Arc::new(forwarder),
        Err(e) => {
            error!("Error creating clients, log shipper will not start: {e}");
            return ExitCode::FAILURE;
        }
    };

    let cancel_token = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel_token.clone()));

    let scheduler = Scheduler::new(
        forwarder,
        config.targets.clone(),
        config.interval,
        cancel_token,
    );
    scheduler.run().await;

    info!("Log shipper stopped");
    ExitCode::SUCCESS
}

fn filter_directives(log_level: LevelFilter) -> String {
    format!("{NOISY_TARGETS},{log_level}")
}

fn init_logging(log_level: LevelFilter) {
    let env_filter = EnvFilter::try_new(filter_directives(log_level))
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(LevelFilter::INFO)));

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Unable to install log subscriber: {e}");
        return;
    }
    debug!("Logging subsystem enabled");
}

/// Cancels `token` on Ctrl+C, or SIGTERM on unix.
async fn cancel_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = interrupt => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
    token.cancel();
}
