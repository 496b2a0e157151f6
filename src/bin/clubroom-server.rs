// ABOUTME: Clubroom server binary: config load, database connect, serve
// ABOUTME: Environment-driven with a couple of CLI overrides for local runs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

//! Clubroom server entry point

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use clubroom::config::environment::ServerConfig;
use clubroom::database::Database;
use clubroom::errors::{AppError, AppResult};
use clubroom::routes;
use clubroom::state::ServerState;

#[derive(Parser)]
#[command(name = "clubroom-server", about = "Clubroom membership backend")]
struct Args {
    /// Override the HTTP listen port
    #[arg(long)]
    port: Option<u16>,

    /// Override the database URL
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }

    let database = Database::new(&config.database_url).await?;
    info!(database_url = %config.database_url, "database ready");

    let http_port = config.http_port;
    let state = ServerState::new(config, database)?;
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", http_port))
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind port {http_port}: {e}")))?;
    info!(port = http_port, "clubroom listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    Ok(())
}

async fn shutdown_signal() {
    // Shut down cleanly on ctrl-c; a failed signal hook just means no
    // graceful shutdown
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
