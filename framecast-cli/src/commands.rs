//! CLI command implementations

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;
use framecast_core::config::FramecastConfig;
use framecast_core::pipeline::{AssetPipeline, CancelToken, RenderRequest};
use framecast_core::render::{CommandRenderer, NullRenderer, VideoRenderer};
use framecast_core::script::{BrandColors, Script};
use framecast_core::storage::{FsObjectStore, ObjectStore, artifact_key};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port to bind to
        #[arg(short, long, default_value = "3001")]
        port: u16,
        /// Path to the external renderer binary
        #[arg(long)]
        renderer: Option<PathBuf>,
        /// Use the simulation renderer instead of a real one
        #[arg(long)]
        simulate: bool,
    },
    /// Render a single script inline, without the job machinery
    Render {
        /// Path to the script JSON file
        script: PathBuf,
        /// Sprint identifier for the artifact key
        #[arg(long)]
        sprint_id: String,
        /// Day number for the artifact key
        #[arg(long)]
        day: u32,
        /// Path to the external renderer binary
        #[arg(long)]
        renderer: Option<PathBuf>,
        /// Use the simulation renderer instead of a real one
        #[arg(long)]
        simulate: bool,
    },
    /// Check whether an artifact exists in storage
    Status {
        /// Sprint identifier for the artifact key
        #[arg(long)]
        sprint_id: String,
        /// Day number for the artifact key
        #[arg(long)]
        day: u32,
    },
}

/// Handle the CLI command
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Serve {
            host,
            port,
            renderer,
            simulate,
        } => serve(host, port, renderer, simulate).await,
        Commands::Render {
            script,
            sprint_id,
            day,
            renderer,
            simulate,
        } => render_inline(script, sprint_id, day, renderer, simulate).await,
        Commands::Status { sprint_id, day } => status(sprint_id, day).await,
    }
}

fn build_renderer(
    binary: Option<PathBuf>,
    simulate: bool,
) -> anyhow::Result<Arc<dyn VideoRenderer>> {
    if simulate {
        return Ok(Arc::new(NullRenderer::new()));
    }

    let binary = binary.context("--renderer is required unless --simulate is set")?;
    let renderer = CommandRenderer::new(binary);
    if !renderer.is_available() {
        anyhow::bail!("renderer binary is not available; check the path or use --simulate");
    }
    Ok(Arc::new(renderer))
}

async fn serve(
    host: String,
    port: u16,
    renderer: Option<PathBuf>,
    simulate: bool,
) -> anyhow::Result<()> {
    let config = FramecastConfig::from_env();
    let renderer = build_renderer(renderer, simulate)?;

    let bind_address: SocketAddr = format!("{host}:{port}")
        .parse()
        .context("invalid host/port")?;

    println!("Starting Framecast video service...");
    println!("API: http://{bind_address}");
    println!("Health check: http://{bind_address}/health");
    if simulate {
        println!("Mode: Simulation (stub renderer)");
    }
    println!("Press Ctrl+C to stop the server");

    framecast_web::run_server(config, bind_address, renderer)
        .await
        .map_err(|e| anyhow::anyhow!("server error: {e}"))
}

async fn render_inline(
    script_path: PathBuf,
    sprint_id: String,
    day: u32,
    renderer: Option<PathBuf>,
    simulate: bool,
) -> anyhow::Result<()> {
    let config = FramecastConfig::from_env();
    let renderer = build_renderer(renderer, simulate)?;

    let script_json = tokio::fs::read_to_string(&script_path)
        .await
        .with_context(|| format!("failed to read {}", script_path.display()))?;
    let script: Script =
        serde_json::from_str(&script_json).context("failed to parse script JSON")?;

    let store = Arc::new(FsObjectStore::new(
        config.storage.root.clone(),
        config.storage.public_base_url.clone(),
    ));
    let pipeline = AssetPipeline::new(renderer, store, config);

    let request = RenderRequest {
        sprint_id,
        day_number: day,
        script,
        brand_colors: BrandColors::default(),
    };

    println!(
        "Rendering \"{}\" ({} segments)...",
        request.script.title,
        request.script.segments.len()
    );

    let artifact = pipeline
        .render_video(&request, None, &CancelToken::never())
        .await?;

    println!("Render complete");
    println!("  URL: {}", artifact.url);
    println!("  File: {}", artifact.file_name);
    println!("  Duration: {:.1}s", artifact.duration_seconds);
    println!("  Size: {} bytes", artifact.file_size_bytes);
    println!("  Resolution: {}", artifact.resolution);

    Ok(())
}

async fn status(sprint_id: String, day: u32) -> anyhow::Result<()> {
    let config = FramecastConfig::from_env();
    let store = FsObjectStore::new(
        config.storage.root.clone(),
        config.storage.public_base_url.clone(),
    );

    let key = artifact_key(&sprint_id, day);
    if store.exists(&key).await? {
        println!("Artifact exists: {}", store.public_url(&key));
    } else {
        println!("No artifact for {key}");
    }

    Ok(())
}
