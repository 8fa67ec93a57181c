//! Renderer abstraction for both production and simulation modes.
//!
//! The visual rendering engine is an external collaborator: it consumes a
//! compiled timeline plus per-segment content and produces a video file.
//! Everything behind [`VideoRenderer`] is swappable presentation plumbing;
//! the pipeline only cares about the contract.

mod command;
mod null;

use std::path::Path;

use async_trait::async_trait;
pub use command::CommandRenderer;
pub use null::NullRenderer;
use serde::Serialize;

use crate::config::RenderConfig;
use crate::script::{BrandColors, Script};
use crate::timeline::Timeline;

/// Errors from renderer invocation.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Renderer failed: {reason}")]
    Failed { reason: String },

    #[error("Render timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Render I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Inputs handed to the renderer alongside the compiled timeline.
#[derive(Debug, Clone, Serialize)]
pub struct RenderInputs {
    pub script: Script,
    #[serde(rename = "brandColors")]
    pub brand_colors: BrandColors,
    #[serde(rename = "sprintId")]
    pub sprint_id: String,
    #[serde(rename = "dayNumber")]
    pub day_number: u32,
    /// Local path of the downloaded audio track, if the script has one
    #[serde(skip)]
    pub audio_path: Option<std::path::PathBuf>,
}

/// Result of a successful render.
#[derive(Debug, Clone)]
pub struct RenderedVideo {
    /// Frames actually rendered (bounded by the timeline's total)
    pub frames_rendered: u64,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl RenderedVideo {
    /// Rendered duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.frames_rendered as f64 / self.fps as f64
    }

    /// Resolution formatted as `{width}x{height}`.
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Abstraction over the external frame-by-frame rendering engine.
#[async_trait]
pub trait VideoRenderer: Send + Sync {
    /// Renders a compiled timeline to a video file at `output_path`.
    ///
    /// Implementations must honor the deterministic codec profile and the
    /// concurrency budget in `config`, and must not outlive
    /// `config.timeout`.
    ///
    /// # Errors
    /// - `RenderError::Failed` - Renderer invocation failed
    /// - `RenderError::Timeout` - Render exceeded the configured timeout
    /// - `RenderError::Io` - File I/O error around the invocation
    async fn render(
        &self,
        timeline: &Timeline,
        inputs: &RenderInputs,
        output_path: &Path,
        config: &RenderConfig,
    ) -> Result<RenderedVideo, RenderError>;

    /// Check whether the renderer is available and properly configured.
    fn is_available(&self) -> bool;
}
