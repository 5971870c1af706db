mod api;
mod state;
mod stream;

use std::{path::PathBuf, sync::Arc};

use axum::{routing::get, Json, Router};
use sonoaudio::StreamManager;
use sonoconfig::get_config;
use sonoserver::Server;
use sonotheme::{MetadataSaver, ThemeRegistry};
use tracing::info;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ========== Phase 1: configuration & logging ==========
    let config = get_config();
    sonoserver::init_logging(&config.get_log_level());

    let audio_root = config.get_audio_root()?;
    info!(audio_root = %audio_root, "🎵 Scanning themes...");

    // ========== Phase 2: theme catalogue & stream engine ==========
    let registry = Arc::new(ThemeRegistry::open(PathBuf::from(&audio_root))?);
    for theme in registry.list() {
        info!(
            "  - {} ({}) — {} track(s)",
            theme.name(),
            theme.id(),
            theme.tracks().len()
        );
    }

    let manager = Arc::new(StreamManager::new(config.get_max_streams()));
    let saver = MetadataSaver::spawn(registry.clone(), config.get_persist_metadata());

    let state = AppState {
        registry,
        manager: manager.clone(),
        saver,
    };

    // ========== Phase 3: HTTP server ==========
    let mut server = Server::new("Sonorium", config.get_base_url(), config.get_http_port());

    let server_info = server.info();
    server.add_router(Router::new().route(
        "/info",
        get(move || {
            let info = server_info.clone();
            async move { Json(info) }
        }),
    ));
    server.add_router(api::create_router(state.clone()));
    server.add_router(stream::create_router(state.clone()));

    info!("🌐 Starting HTTP server...");
    server.start().await?;

    info!(
        "✅ Sonorium is ready — streams at {}/stream/{{theme_id}}",
        server.base_url()
    );
    info!("Press Ctrl+C to stop...");

    server.wait().await;

    // HTTP is down; stop the per-listener workers before exiting.
    info!("Stopping live streams...");
    manager.cancel_all();
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    info!("✅ Sonorium stopped");
    Ok(())
}
