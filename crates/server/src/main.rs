use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdfsmith_core::{
    load_config, validate_config, HttpMediaFetcher, LatexToolchain, MediaFetcher, PdfService,
    Toolchain, ToolchainConfig, WorkspaceSweeper,
};
use pdfsmith_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());

    // LOG_FORMAT=json switches to structured output
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn run() -> Result<()> {
    init_logging();

    // Determine config path
    let config_path = std::env::var("PDFSMITH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("pdfsmith {} loading configuration from {:?}", VERSION, config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!("Configuration loaded successfully (hash {})", &config_hash[..16]);
    info!("Workspace root: {:?}", config.paths.temporal);
    info!(
        "Admission capacity: {}, typesetting passes: {}, optimize: {}",
        config.generation.admission_capacity,
        config.generation.typeset_passes,
        config.generation.optimize
    );

    // External tools may be installed after startup, so a missing binary is only a warning.
    let toolchain = LatexToolchain::new(ToolchainConfig::from(&config.paths));
    match toolchain.validate().await {
        Ok(()) => info!("Toolchain available"),
        Err(e) => warn!("Toolchain check failed, generation will fail until fixed: {}", e),
    }
    let toolchain: Arc<dyn Toolchain> = Arc::new(toolchain);

    let fetcher: Arc<dyn MediaFetcher> = Arc::new(
        HttpMediaFetcher::new(&config.media).context("Failed to create media fetcher")?,
    );

    let service = Arc::new(PdfService::new(&config, toolchain, fetcher));
    info!("Generation service started");

    // Workspace sweeper
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let sweeper_handle = if config.cleanup.enabled {
        let sweeper = WorkspaceSweeper::new(config.paths.temporal.clone(), config.cleanup.clone());
        Some(sweeper.spawn(shutdown_tx.subscribe()))
    } else {
        info!("Workspace cleanup disabled in config");
        None
    };

    // Create app state and router
    let state = Arc::new(AppState::new(config.clone(), service));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    let _ = shutdown_tx.send(());
    if let Some(handle) = sweeper_handle {
        let _ = handle.await;
        info!("Workspace sweeper stopped");
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
