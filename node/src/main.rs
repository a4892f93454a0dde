// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Permaseed Node
//!
//! Entry point for the `permaseed-node` binary. Parses CLI arguments,
//! initializes logging and metrics, opens the store, and serves the HTTP
//! API and the metrics endpoint until a shutdown signal arrives.

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use permaseed::{SeedDB, SeedingService};

use cli::{Commands, PermaseedNodeCli};
use logging::LogFormat;
use metrics::SeedMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = PermaseedNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(&args.log_level, LogFormat::from_str_lossy(&args.log_format));

    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        "starting permaseed-node"
    );

    // --- Persistent storage ---
    let db_path = args.data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;

    let db = SeedDB::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    tracing::info!(
        path = %db_path.display(),
        transactions = db.tx_count(),
        chunks = db.chunk_count(),
        "database opened"
    );

    let service = Arc::new(SeedingService::new(db));

    // --- Metrics ---
    let seed_metrics = Arc::new(SeedMetrics::new().context("failed to register metrics")?);
    let end_offset = service
        .end_offset()
        .context("failed to read the global end offset")?;
    seed_metrics.set_end_offset(end_offset);
    tracing::info!(end_offset, "offset counter loaded");

    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            permaseed::config::PROTOCOL_VERSION,
        ),
        service: Arc::clone(&service),
        metrics: Arc::clone(&seed_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&seed_metrics));
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
            tracing::info!("shutdown signal received");
        }
    }

    service.db().flush().context("failed to flush database")?;
    tracing::info!("permaseed-node stopped");
    Ok(())
}

fn print_version() {
    println!("permaseed-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol       {}", permaseed::config::PROTOCOL_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// If a handler cannot be installed, that signal is never waited on.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
