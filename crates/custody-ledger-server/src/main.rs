//! custody-ledger-server: HTTP front end for a tamper-evident custody ledger.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use custody_ledger_server::{build_state, create_router, Backend, Config};

#[derive(Parser)]
#[command(name = "custody-ledger-server")]
#[command(about = "Tamper-evident custody ledger over HTTP")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "CUSTODY_LEDGER_CONFIG", default_value = "custody-ledger.toml")]
    config: PathBuf,

    /// Listen address (overrides config file)
    #[arg(short, long, env = "CUSTODY_LEDGER_LISTEN")]
    listen: Option<SocketAddr>,

    /// Storage backend (overrides config file)
    #[arg(long, env = "CUSTODY_LEDGER_BACKEND", value_enum)]
    backend: Option<Backend>,

    /// SQLite database path (overrides config file)
    #[arg(long, env = "CUSTODY_LEDGER_DB_PATH")]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("custody_ledger=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    info!("Config file: {}", cli.config.display());
    let mut config = Config::load(&cli.config)?;

    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }
    if let Some(backend) = cli.backend {
        config.storage.backend = backend;
    }
    if let Some(path) = cli.db_path {
        config.storage.path = path;
    }

    match config.storage.backend {
        Backend::Sqlite => info!("Storage: sqlite at {}", config.storage.path.display()),
        Backend::Memory => info!("Storage: memory (records are lost on exit)"),
    }

    let state = build_state(&config)?;
    let records = state.ledger.len().await?;
    info!(records, "Ledger opened");

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.listen).await?;
    info!("Listening on http://{}", config.server.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
