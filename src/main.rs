// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use bindconf::api::{self, AppState};
use bindconf::config::ServiceConfig;
use clap::Parser;
use std::sync::Arc;
use tracing::{debug, info, warn};

fn main() -> Result<()> {
    let config = ServiceConfig::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .thread_name("bindconf-api")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: ServiceConfig) -> Result<()> {
    // Respects RUST_LOG if set, otherwise defaults to INFO level.
    // RUST_LOG_FORMAT=json switches to JSON output.
    init_tracing(std::env::var("RUST_LOG_FORMAT").ok().as_deref());

    info!(
        config_path = %config.config_path.display(),
        backup_dir = %config.backup_dir.display(),
        "Starting BIND9 configuration manager"
    );
    if config.api_token.as_deref().is_none_or(str::is_empty) {
        warn!("No API token configured, /api/v1 is unauthenticated");
    }
    if config.skip_validation_on_commit {
        warn!("Validation on commit is disabled");
    }

    let manager = Arc::new(config.manager());
    debug!(manager = ?manager, "Configuration manager created");

    let state = AppState::new(manager, config.api_token.clone());
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!(listen = %config.listen, "HTTP API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Shutdown complete");
    Ok(())
}

/// Whether `RUST_LOG_FORMAT` asks for JSON output.
fn wants_json(format: Option<&str>) -> bool {
    format.is_some_and(|f| f.eq_ignore_ascii_case("json"))
}

fn init_tracing(format: Option<&str>) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if wants_json(format) {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_target(false)
            .with_ansi(true)
            .compact()
            .init();
    }
}

/// Resolve on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
