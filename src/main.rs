//! Lumen Grid binary entrypoint wiring the frame engine, Art-Net output,
//! and the WebSocket command protocol.

use std::{env, net::SocketAddr};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lumen_grid::{
    color::ColorManager,
    config::AppConfig,
    dao::PresetStore,
    engine::Engine,
    grid::PanelGrid,
    output::{ArtNetSink, BroadcastSink, FrameHub, OutputSink},
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();

    let frames = FrameHub::new(16);
    let (engine_handle, engine_task) = build_engine(&config, frames.clone());

    let presets = PresetStore::load(config.storage.preset_file.clone())
        .context("loading effect preset store")?;

    let app_state = AppState::new(config.clone(), engine_handle.clone(), frames, presets);

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(config.server.port);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    // Drain the engine so the Art-Net sink can emit its blackout frame.
    if let Err(err) = engine_handle.shutdown().await {
        warn!(error = %err, "engine was already gone at shutdown");
    }
    let _ = engine_task.await;

    Ok(())
}

/// Assemble the frame engine with its output sinks and spawn its task.
fn build_engine(
    config: &AppConfig,
    frames: FrameHub,
) -> (lumen_grid::engine::EngineHandle, tokio::task::JoinHandle<()>) {
    let engine_config = &config.engine;
    let grid = PanelGrid::new(
        engine_config.columns,
        engine_config.rows_per_column,
        engine_config.initial_topology,
    );

    let mut colors = ColorManager::with_defaults();
    colors.load_presets_from_config(&config.presets);

    let mut sinks: Vec<Box<dyn OutputSink>> = vec![Box::new(BroadcastSink::new(frames))];
    if config.artnet.enabled {
        match ArtNetSink::new(config.artnet.clone()) {
            Ok(sink) => sinks.push(Box::new(sink)),
            Err(err) => warn!(error = %err, "art-net sink disabled: socket setup failed"),
        }
    }

    Engine::new(grid, colors, engine_config.target_fps, sinks).spawn()
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
