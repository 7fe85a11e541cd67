use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use devcamper_api::{app, config, database, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env files if present so cargo run picks up PORT, DATABASE_URL, etc.
    let _ = dotenvy::dotenv();
    let _ = dotenvy::from_filename("config/config.env");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config().clone();
    config.validate().map_err(anyhow::Error::msg)?;
    info!("Starting DevCamper API in {:?} mode", config.environment);

    let store = database::connect(&config.database)
        .await
        .context("failed to connect to the document store")?;
    info!("Document store ready ({})", store.backend());

    tokio::fs::create_dir_all(&config.upload.file_upload_path)
        .await
        .with_context(|| format!("failed to create {}", config.upload.file_upload_path.display()))?;

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Server running in {:?} mode on http://{}", config.environment, bind_addr);

    let state = AppState::new(store.clone(), config);
    let served = axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    store.close().await;
    if let Err(e) = served {
        error!("Server error: {}", e);
        return Err(e.into());
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
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
                error!("Failed to listen for SIGTERM: {}", e);
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
    info!("Shutdown signal received");
}
