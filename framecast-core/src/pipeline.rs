//! Asset pipeline: fetch audio, render, upload, clean up.
//!
//! One pipeline run is single-use: it acquires a scoped temp workspace,
//! downloads the script's audio track if present, invokes the renderer,
//! uploads the artifact under its deterministic key, and removes the
//! workspace on every exit path. Cleanup failure is logged but never
//! masks the error that caused the exit. Retry policy belongs to the
//! caller; the workspace and audio download are per-attempt resources.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch};

use crate::config::FramecastConfig;
use crate::render::{RenderError, RenderInputs, VideoRenderer};
use crate::script::{BrandColors, Script};
use crate::storage::{ObjectStore, StorageError, artifact_key};
use crate::timeline::{Timeline, TimelineError};

/// Errors from a pipeline run, classified per failing step.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid render request: {reason}")]
    InvalidRequest { reason: String },

    #[error("{0}")]
    Timeline(#[from] TimelineError),

    #[error("Audio fetch failed: {reason}")]
    AssetFetch { reason: String },

    #[error("{0}")]
    Render(#[from] RenderError),

    #[error("Artifact upload failed: {0}")]
    Upload(#[from] StorageError),

    #[error("Render cancelled")]
    Cancelled,

    #[error("Workspace I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One render request: identity, script, and branding.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub sprint_id: String,
    pub day_number: u32,
    pub script: Script,
    pub brand_colors: BrandColors,
}

impl RenderRequest {
    /// Validates required identity fields and a non-empty script.
    ///
    /// The sprint id becomes a single path component of both the
    /// workspace directory and the artifact key, so it must not carry
    /// path separators or relative-path components.
    ///
    /// # Errors
    /// - `PipelineError::InvalidRequest` - Missing or unsafe sprint id,
    ///   day number of zero, or a script with no segments
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.sprint_id.trim().is_empty() {
            return Err(PipelineError::InvalidRequest {
                reason: "sprintId must not be empty".to_string(),
            });
        }
        if self.sprint_id.contains(['/', '\\'])
            || self.sprint_id == "."
            || self.sprint_id == ".."
        {
            return Err(PipelineError::InvalidRequest {
                reason: "sprintId must not contain path separators".to_string(),
            });
        }
        if self.day_number == 0 {
            return Err(PipelineError::InvalidRequest {
                reason: "dayNumber must be at least 1".to_string(),
            });
        }
        if self.script.segments.is_empty() {
            return Err(PipelineError::InvalidRequest {
                reason: "videoScript must contain at least one segment".to_string(),
            });
        }
        Ok(())
    }
}

/// Metadata for a persisted artifact. Produced once, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactInfo {
    #[serde(rename = "videoUrl")]
    pub url: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    /// Rendered duration in seconds (frames rendered / fps)
    #[serde(rename = "duration")]
    pub duration_seconds: f64,
    #[serde(rename = "fileSize")]
    pub file_size_bytes: u64,
    pub resolution: String,
}

/// Cancellation handle held by the job registry.
///
/// Dropping the handle does not cancel; cancellation is explicit.
#[derive(Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // Receivers may already be gone if the pipeline finished
        let _ = self.tx.send(true);
    }
}

/// Cooperative cancellation token checked between pipeline steps.
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Creates a connected handle/token pair.
    pub fn new() -> (CancelHandle, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx: Arc::new(tx) }, CancelToken { rx })
    }

    /// A token that never reports cancellation.
    pub fn never() -> CancelToken {
        let (_, token) = CancelToken::new();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    fn check(&self) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Progress sender wired into a pipeline run. `None` discards updates.
pub type ProgressSender = Option<mpsc::UnboundedSender<u8>>;

fn report(progress: &ProgressSender, percent: u8) {
    if let Some(tx) = progress {
        // Receiver may have stopped listening; progress is best-effort
        let _ = tx.send(percent);
    }
}

/// Scoped temporary workspace for one pipeline attempt.
///
/// Removal runs on every exit path, including cancellation. Existence of
/// the directory implies a pipeline run is still in flight.
struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    async fn create(root: &Path, sprint_id: &str, day_number: u32) -> std::io::Result<Self> {
        let dir = root.join(format!("framecast-{sprint_id}-{day_number}"));
        tokio::fs::create_dir_all(&dir).await?;
        tracing::debug!("Created workspace: {}", dir.display());
        Ok(Self { dir })
    }

    fn path(&self) -> &Path {
        &self.dir
    }

    async fn cleanup(self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.dir).await {
            // Never masks the pipeline's own result
            tracing::warn!("Workspace cleanup failed for {}: {}", self.dir.display(), e);
        } else {
            tracing::debug!("Removed workspace: {}", self.dir.display());
        }
    }
}

/// The multi-step asset pipeline.
///
/// Holds the external collaborators (renderer, object store, HTTP client)
/// and drives one request from script to persisted artifact.
#[derive(Clone)]
pub struct AssetPipeline {
    renderer: Arc<dyn VideoRenderer>,
    store: Arc<dyn ObjectStore>,
    http: reqwest::Client,
    config: FramecastConfig,
}

impl AssetPipeline {
    pub fn new(
        renderer: Arc<dyn VideoRenderer>,
        store: Arc<dyn ObjectStore>,
        config: FramecastConfig,
    ) -> Self {
        Self {
            renderer,
            store,
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn config(&self) -> &FramecastConfig {
        &self.config
    }

    /// Runs the full pipeline for one request.
    ///
    /// Progress milestones are emitted over `progress` as the steps
    /// complete; `cancel` is checked between steps. The workspace is
    /// removed on success, failure, and cancellation alike.
    ///
    /// # Errors
    /// - `PipelineError::InvalidRequest` - Malformed request
    /// - `PipelineError::Timeline` - Segment timing rejected
    /// - `PipelineError::AssetFetch` - Audio download failed or timed out
    /// - `PipelineError::Render` - Renderer invocation failed
    /// - `PipelineError::Upload` - Storage write failed
    /// - `PipelineError::Cancelled` - Cancellation observed between steps
    pub async fn render_video(
        &self,
        request: &RenderRequest,
        progress: ProgressSender,
        cancel: &CancelToken,
    ) -> Result<ArtifactInfo, PipelineError> {
        request.validate()?;
        cancel.check()?;

        let workspace = Workspace::create(
            &self.config.pipeline.workspace_root,
            &request.sprint_id,
            request.day_number,
        )
        .await?;

        let result = self.execute(request, workspace.path(), &progress, cancel).await;
        workspace.cleanup().await;
        result
    }

    async fn execute(
        &self,
        request: &RenderRequest,
        workspace: &Path,
        progress: &ProgressSender,
        cancel: &CancelToken,
    ) -> Result<ArtifactInfo, PipelineError> {
        let audio_path = match &request.script.audio_file {
            Some(url) => {
                let path = workspace.join("audio.mp3");
                self.download_audio(url, &path).await?;
                tracing::info!("Audio downloaded: {}", path.display());
                Some(path)
            }
            None => None,
        };
        report(progress, 25);
        cancel.check()?;

        let timeline = Timeline::compile(
            &request.script,
            self.config.render.fps,
            self.config.pipeline.overrun_policy,
        )?;
        report(progress, 40);
        cancel.check()?;

        let output_path = workspace.join("output.mp4");
        let inputs = RenderInputs {
            script: request.script.clone(),
            brand_colors: request.brand_colors.clone(),
            sprint_id: request.sprint_id.clone(),
            day_number: request.day_number,
            audio_path,
        };
        let rendered = self
            .renderer
            .render(&timeline, &inputs, &output_path, &self.config.render)
            .await?;
        report(progress, 75);
        cancel.check()?;

        let key = artifact_key(&request.sprint_id, request.day_number);
        let bytes = Bytes::from(tokio::fs::read(&output_path).await?);
        let file_size_bytes = bytes.len() as u64;

        tracing::info!(
            "Uploading artifact {} ({} bytes)",
            key,
            file_size_bytes
        );
        self.store.put(&key, bytes).await?;
        report(progress, 90);

        let url = self.store.public_url(&key);
        tracing::info!("Artifact persisted: {}", url);

        Ok(ArtifactInfo {
            url,
            file_name: key,
            duration_seconds: rendered.duration_seconds(),
            file_size_bytes,
            resolution: rendered.resolution(),
        })
    }

    /// Streams the audio track into the workspace with a bounded timeout.
    async fn download_audio(&self, url: &str, output_path: &Path) -> Result<(), PipelineError> {
        let fetch = async {
            let response = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|e| PipelineError::AssetFetch {
                    reason: e.to_string(),
                })?
                .error_for_status()
                .map_err(|e| PipelineError::AssetFetch {
                    reason: e.to_string(),
                })?;

            let mut file = tokio::fs::File::create(output_path).await?;
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| PipelineError::AssetFetch {
                    reason: e.to_string(),
                })?;
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok(())
        };

        match tokio::time::timeout(self.config.pipeline.audio_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(PipelineError::AssetFetch {
                reason: format!(
                    "timed out after {}s downloading {url}",
                    self.config.pipeline.audio_timeout.as_secs()
                ),
            }),
        }
    }
}
