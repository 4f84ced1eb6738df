use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scriptdeck_api::config::ServerConfig;
use scriptdeck_api::router::build_app_router;
use scriptdeck_api::state::AppState;
use scriptdeck_core::catalog::ScriptCatalog;
use scriptdeck_core::ledger::ExecutionLedger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scriptdeck=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        scripts_dir = %config.scripts_dir.display(),
        "Loaded server configuration"
    );

    // --- Startup checks ---
    // An unreadable scripts directory is process-fatal misconfiguration;
    // everything past startup is scoped to a single request.
    std::fs::read_dir(&config.scripts_dir).with_context(|| {
        format!(
            "Scripts directory {} is not readable",
            config.scripts_dir.display()
        )
    })?;

    // --- Services ---
    let catalog = Arc::new(ScriptCatalog::new(config.scripts_dir.clone()));
    let discovered = catalog.refresh().await.context("Initial script scan failed")?;
    tracing::info!(count = discovered.len(), "Discovered scripts");

    let ledger = Arc::new(ExecutionLedger::new(
        config.log_file.clone(),
        config.max_log_lines,
    ));
    tracing::info!(log_file = %ledger.path().display(), "Execution ledger ready");

    // --- App state / router ---
    let state = AppState {
        config: Arc::new(config.clone()),
        catalog,
        ledger,
    };
    let app = build_app_router(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().context("Invalid HOST address")?,
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
