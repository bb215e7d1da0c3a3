mod config;
mod editor;
mod errors;
mod export;
mod gallery;
mod modal;
mod models;
mod routes;
mod session;
mod state;
mod store;
mod view;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, StoreBackend};
use crate::editor::Page;
use crate::export::raster::Rasterizer;
use crate::export::{CommandRasterizer, ExportSettings, Exporter, LopdfAssembler};
use crate::routes::build_router;
use crate::session::notices::Notices;
use crate::session::{Session, SessionSettings};
use crate::state::AppState;
use crate::store::{FileStore, KeyValueStore, MemoryStore, PersistenceStore, RedisStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Edufolio v{}", env!("CARGO_PKG_VERSION"));

    // Persistence
    let backend = build_backend(&config).await?;
    let store = Arc::new(PersistenceStore::new(
        backend,
        config.storage_key.clone(),
        config.autosave_debounce,
    ));
    info!(
        "Store initialized ({:?}, key '{}')",
        config.store_backend,
        store.key()
    );

    // Export collaborators
    let rasterizer: Option<Arc<dyn Rasterizer>> = match &config.rasterizer_cmd {
        Some(cmd) => {
            info!("Rasterizer: {cmd}");
            Some(Arc::new(CommandRasterizer::new(cmd, &config.rasterizer_args)))
        }
        None => {
            warn!("RASTERIZER_CMD is not set; PDF export is unavailable");
            None
        }
    };
    let exporter = Exporter::new(
        rasterizer,
        Some(Arc::new(LopdfAssembler)),
        ExportSettings {
            settle_delay: config.export_settle,
            region_width_px: config.region_width_px,
        },
    );

    // Session
    let session = Arc::new(Session::new(
        Page::new().shared(),
        store,
        exporter,
        Notices::new(),
        SessionSettings {
            periodic_save: config.periodic_save,
        },
    ));
    session.start().await;

    let state = AppState {
        session: session.clone(),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    session.shutdown().await;
    Ok(())
}

async fn build_backend(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    let backend: Arc<dyn KeyValueStore> = match config.store_backend {
        StoreBackend::Memory => Arc::new(match config.store_quota_bytes {
            Some(quota) => MemoryStore::with_quota(quota),
            None => MemoryStore::new(),
        }),
        StoreBackend::File => Arc::new(
            FileStore::open(&config.data_dir, config.store_quota_bytes)
                .with_context(|| format!("Cannot open data directory {}", config.data_dir.display()))?,
        ),
        StoreBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .context("REDIS_URL is required for the redis store")?;
            Arc::new(RedisStore::connect(url).await?)
        }
    };
    Ok(backend)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
