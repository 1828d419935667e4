//! # Glider Server
//!
//! Accepts build submissions, delegates them to an executor service and
//! brokers everything around the running build: input bits, live logs, the
//! final result, aborts and interactive sessions.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use glider_server::{
    AppState, create_app,
    infra::{
        config::{ConfigLoad, ConfigLoader, ConfigLoaderOptions, ConfigOverrides},
        telemetry::init_tracing,
    },
    serve,
};
use tracing::{info, warn};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "glider-server")]
#[command(about = "Build-coordination server brokering traffic to an executor")]
struct Cli {
    /// Address to listen on (default 0.0.0.0:5637)
    #[arg(long, env = "GLIDER_LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// host:port the executor uses to reach this server (required)
    #[arg(long, env = "GLIDER_PEER_ADDR")]
    peer_addr: Option<String>,

    /// Base URL of the executor service (default http://127.0.0.1:4637)
    #[arg(long, env = "GLIDER_EXECUTOR_URL")]
    executor_url: Option<String>,

    /// Path to a TOML config file
    #[arg(long, env = "GLIDER_CONFIG")]
    config: Option<PathBuf>,

    /// Path to a .env file loaded before reading the environment
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let ConfigLoad { config, warnings } =
        ConfigLoader::with_options(ConfigLoaderOptions {
            config_path: cli.config,
            env_file: cli.env_file,
        })
        .overrides(ConfigOverrides {
            listen_addr: cli.listen_addr,
            peer_addr: cli.peer_addr,
            executor_url: cli.executor_url,
        })
        .load()
        .context("failed to load configuration")?;

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = config.metadata.config_path.as_ref() {
        info!(path = %path.display(), "loaded config file");
    }
    for warning in warnings.iter() {
        match &warning.hint {
            Some(hint) => warn!(
                message = %warning.message,
                hint = %hint,
                "configuration warning"
            ),
            None => warn!(message = %warning.message, "configuration warning"),
        }
    }

    info!(
        listen_addr = %config.server.listen_addr,
        peer_addr = %config.server.peer_addr,
        executor_url = %config.executor.url,
        bits.fetch_timeout_ms = config.bits.fetch_timeout.as_millis() as u64,
        bits.pickup_timeout_ms = config.bits.pickup_timeout.as_millis() as u64,
        "configuration in effect"
    );

    let config = Arc::new(config);
    let state = AppState::from_config(Arc::clone(&config))?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| {
            format!("failed to bind {}", config.server.listen_addr)
        })?;
    info!("Starting Glider server on {}", listener.local_addr()?);

    serve(listener, app, shutdown_signal()).await?;
    info!("Glider server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
