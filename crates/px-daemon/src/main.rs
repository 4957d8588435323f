// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `proxd` — the foreground supervisor/proxy binary (SPEC_FULL §4.13):
//! loads the YAML config, wires the log manager, supervisor, proxy service
//! and admin API together, and owns the top-level shutdown sequencing.
//!
//! Grounded on `oj-daemon`'s `main.rs`: info-flag handling before any
//! startup work, `tracing-subscriber` with an `EnvFilter`, and a top-level
//! `tokio::select!` racing the running services against OS signals.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod cli;
mod env;

use clap::Parser;
use cli::Cli;
use px_core::{ProcessConfig, SystemClock};
use px_logs::LogManager;
use px_proxy::ProxyService;
use px_runner::UnixRunner;
use px_supervisor::Supervisor;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let config = match px_config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, path = %cli.config.display(), "failed to load config");
            return Err(e.into());
        }
    };

    let log_manager = Arc::new(LogManager::<SystemClock>::new(px_logs::DEFAULT_CAPACITY));

    let processes: Vec<ProcessConfig> = config.processes.values().cloned().collect();
    let supervisor = Arc::new(Supervisor::new(processes, Arc::new(UnixRunner::new()), Arc::clone(&log_manager), SystemClock));

    let proxy = match &config.proxy {
        Some(proxy_config) if proxy_config.enabled => {
            let service = Arc::new(ProxyService::new(proxy_config.clone(), SystemClock));
            if proxy_config.https_port.is_some() {
                if let Some(certs) = &config.certs {
                    service.set_cert_config(certs.clone());
                }
            }
            Some(service)
        }
        _ => None,
    };

    let start_result = supervisor.start(&[]).await?;
    for (name, err) in &start_result.failed {
        warn!(process = %name, error = %err, "process failed to start");
    }

    if let Some(proxy) = &proxy {
        if let Err(e) = proxy.start().await {
            error!(error = %e, "proxy failed to start");
            supervisor.stop(env::shutdown_timeout()).await;
            return Err(e.into());
        }
    }

    let api_state = px_api::AppState::new(Arc::clone(&supervisor), Arc::clone(&log_manager), proxy.clone());
    let api_router = px_api::build_router(api_state);
    let api_addr = format!("{}:{}", config.api.host, config.api.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!(addr = %api_addr, "admin API listening");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let api_task = tokio::spawn(async move { axum::serve(api_listener, api_router).await });

    tokio::select! {
        result = api_task => {
            match result {
                Ok(Ok(())) => info!("admin API server exited"),
                Ok(Err(e)) => error!(error = %e, "admin API server failed"),
                Err(e) => error!(error = %e, "admin API task panicked"),
            }
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
        }
        _ = sigint.recv() => {
            info!("received SIGINT, shutting down");
        }
    }

    let deadline = env::shutdown_timeout();
    supervisor.stop(deadline).await;
    if let Some(proxy) = &proxy {
        proxy.shutdown().await;
    }

    info!("proxd stopped");
    Ok(())
}

fn init_logging(log_level: Option<&str>) {
    let filter = log_level
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(std::io::stderr)).init();
}
