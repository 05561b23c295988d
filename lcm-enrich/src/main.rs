//! lcm-enrich - BOM enrichment microservice
//!
//! Resolves BOM line items against the Z2Data parts database and serves the
//! enrichment and manual-resolution API over HTTP + SSE.

use anyhow::{Context, Result};
use clap::Parser;
use lcm_common::config::{
    default_config_path, ensure_root_folder, load_toml_config, resolve_root_folder, DEFAULT_PORT,
};
use lcm_common::events::EventBus;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lcm_enrich::AppState;

const CONFIG_FILE: &str = "lcm-enrich.toml";
const EVENT_BUS_CAPACITY: usize = 100;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "lcm-enrich")]
#[command(about = "BOM enrichment microservice for LCM")]
#[command(version)]
struct Args {
    /// HTTP port (defaults to the TOML value, then 5731)
    #[arg(short, long, env = "LCM_ENRICH_PORT")]
    port: Option<u16>,

    /// Root folder holding lcm.db
    #[arg(short, long, env = "LCM_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Bootstrap TOML file (defaults to ~/.config/lcm/lcm-enrich.toml)
    #[arg(short, long, env = "LCM_ENRICH_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .or_else(|| default_config_path(CONFIG_FILE));
    let toml_config = match &config_path {
        Some(path) => load_toml_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Default::default(),
    };

    let default_filter = format!(
        "lcm_enrich={},tower_http=info",
        toml_config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting lcm-enrich (BOM enrichment) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Config: {}", path.display());
    }

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    let db_path = ensure_root_folder(&root_folder)
        .with_context(|| format!("Failed to initialize root folder {}", root_folder.display()))?;
    info!("Database: {}", db_path.display());

    let db_pool = lcm_enrich::db::init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;
    info!("Database connection established");

    let source = match lcm_enrich::config::build_parts_source(&db_pool, &toml_config).await {
        Ok(source) => Some(source),
        Err(e) => {
            warn!("Z2Data source unavailable, enrichment endpoints will return 503: {}", e);
            None
        }
    };

    let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
    let state = AppState::new(db_pool, event_bus, source);
    let app = lcm_enrich::build_router(state);

    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
