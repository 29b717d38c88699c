//! birdex-indexer - Bird photo indexing service
//!
//! Matches photo filenames against a species catalog and files them into a
//! Root → Order → Family → Genus → Species tree.
//!
//! Without a subcommand the HTTP API is served; `scan PATH...` runs a
//! one-shot scan and prints the tree outline.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use birdex_common::config::{load_config, ConfigOverrides, TomlConfig};
use birdex_common::events::EventBus;
use birdex_indexer::services::{DirectoryScanner, PhotoRegistry};
use birdex_indexer::AppState;

/// Command-line arguments for birdex-indexer
#[derive(Parser, Debug)]
#[command(name = "birdex-indexer")]
#[command(about = "Bird photo indexing service")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Species catalog (JSON rows)
    #[arg(long, env = "BIRDEX_CATALOG")]
    catalog: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "BIRDEX_PORT")]
    port: Option<u16>,

    /// Interface to bind
    #[arg(long)]
    host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan folders once and print the taxonomy outline
    Scan {
        /// Root folders to scan
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(
        args.config.as_deref(),
        ConfigOverrides {
            catalog_path: args.catalog.clone(),
            host: args.host.clone(),
            port: args.port,
            log_level: args.log_level.clone(),
        },
    )
    .context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| {
                    tracing_subscriber::EnvFilter::try_new(format!(
                        "birdex_indexer={level},birdex_common={level},tower_http={level}",
                        level = config.logging.level
                    ))
                })
                .unwrap_or_else(|_| "birdex_indexer=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting birdex-indexer");
    info!(
        "Version: {} ({} {}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP")
    );

    let registry = Arc::new(PhotoRegistry::new(config.root_name.clone()));
    let event_bus = EventBus::new(100);

    match &config.catalog_path {
        Some(path) => {
            // Startup continues with an empty catalog on failure
            if let Err(e) =
                birdex_indexer::load_catalog_and_notify(&registry, &event_bus, path)
            {
                warn!(path = %path.display(), error = %e, "Catalog not loaded");
            }
        }
        None => warn!("No catalog configured; no photo will match"),
    }

    match args.command {
        Some(Command::Scan { paths }) => run_scan(&config, registry, paths).await,
        None => serve(config, registry, event_bus).await,
    }
}

/// One-shot scan from the command line
async fn run_scan(config: &TomlConfig, registry: Arc<PhotoRegistry>, paths: Vec<PathBuf>) -> Result<()> {
    let scanner = DirectoryScanner::new(Arc::clone(&registry)).with_settings(&config.scan);

    let counts = tokio::task::spawn_blocking(move || scanner.scan_all(&paths))
        .await
        .context("Scan task failed")?
        .context("Scan aborted")?;

    print!("{}", registry.query_tree().outline());
    println!(
        "Scanned {} photos, matched {}",
        counts.scanned, counts.matched
    );
    Ok(())
}

/// Run the HTTP API until Ctrl+C / SIGTERM
async fn serve(config: TomlConfig, registry: Arc<PhotoRegistry>, event_bus: EventBus) -> Result<()> {
    let state = AppState::new(registry, event_bus, &config);
    let app = birdex_indexer::build_router(state.clone());

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
///
/// Cancels a running scan so its worker threads stop between entries.
async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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

    if let Some(token) = state.cancel_token.read().as_ref() {
        token.cancel();
    }
}
