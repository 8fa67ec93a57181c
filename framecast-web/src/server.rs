//! HTTP server wiring for the Framecast API.
//!
//! Builds the axum router around a shared [`AppState`] and serves it.
//! Every render request runs as an independent job; the HTTP response
//! never blocks on the pipeline unless the caller asks for a synchronous
//! render.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use framecast_core::config::FramecastConfig;
use framecast_core::jobs::{JobRegistry, MemoryJobStore};
use framecast_core::pipeline::AssetPipeline;
use framecast_core::render::VideoRenderer;
use framecast_core::storage::{FsObjectStore, ObjectStore};
use tower_http::cors::CorsLayer;

use crate::handlers::{generate_video, generate_videos_bulk, health, job_status, video_status};

/// Shared application state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: JobRegistry,
}

impl AppState {
    pub fn new(registry: JobRegistry) -> Self {
        Self { registry }
    }

    /// The object store behind the pipeline, for direct artifact lookups.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        self.registry.pipeline().store()
    }
}

/// Builds the API router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/generate-video", post(generate_video))
        .route("/generate-videos-bulk", post(generate_videos_bulk))
        .route("/job-status/{job_id}", get(job_status))
        .route("/video-status/{sprint_id}/{day_number}", get(video_status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Runs the API server until the process is stopped.
///
/// Wires the filesystem object store and in-memory job store around the
/// supplied renderer.
pub async fn run_server(
    config: FramecastConfig,
    bind_address: SocketAddr,
    renderer: Arc<dyn VideoRenderer>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(FsObjectStore::new(
        config.storage.root.clone(),
        config.storage.public_base_url.clone(),
    ));

    let pipeline = AssetPipeline::new(renderer, store, config);
    let registry = JobRegistry::new(pipeline, Arc::new(MemoryJobStore::new()));
    let app = router(AppState::new(registry));

    tracing::info!("Framecast video service running on http://{bind_address}");
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
