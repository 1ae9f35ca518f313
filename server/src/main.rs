// Copyright (c) 2026 EduCoin Contributors. MIT License.
// See LICENSE for details.

//! # EduCoin Server
//!
//! Entry point for the `educoin-server` binary. Parses CLI arguments,
//! initializes logging and metrics, opens the ledger database, and serves
//! the REST API alongside a separate metrics endpoint.
//!
//! The binary supports two subcommands:
//!
//! - `run`     — start the API server
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use educoin_ledger::config::LedgerConfig;
use educoin_ledger::ops::LedgerService;
use educoin_ledger::store::LedgerDb;

use cli::{Commands, EducoinServerCli};
use logging::LogFormat;
use metrics::ServerMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = EducoinServerCli::parse();

    match cli.command {
        Commands::Run(args) => run_server(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the full server: REST API on one port, metrics on another.
async fn run_server(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "educoin_server=info,educoin_ledger=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        port = args.port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        "starting educoin-server"
    );

    // --- Persistent storage ---
    let db_path = args.data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;

    let db = Arc::new(
        LedgerDb::open(&db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?,
    );
    tracing::info!(path = %db_path.display(), "database opened");

    // --- Configuration ---
    let config = LedgerConfig::new(args.teacher_secret.clone());
    if config.uses_default_secret() {
        tracing::warn!(
            "running with the default teacher secret; set EDUCOIN_TEACHER_SECRET before \
             letting students in"
        );
    }

    // --- Metrics ---
    let server_metrics = Arc::new(ServerMetrics::new());
    server_metrics.wallet_count.set(db.wallet_count() as i64);

    // --- Application state ---
    let app_state = api::AppState {
        service: LedgerService::new(Arc::clone(&db), config),
        metrics: Arc::clone(&server_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&server_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    db.flush()?;
    tracing::info!("educoin-server stopped");
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("educoin-server {}", env!("CARGO_PKG_VERSION"));
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
