//! Production renderer invoking an external renderer binary.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;

use super::{RenderError, RenderInputs, RenderedVideo, VideoRenderer};
use crate::config::RenderConfig;
use crate::timeline::Timeline;

/// Renderer that shells out to an external compositing binary.
///
/// The composition (timeline + script + branding) is written to a JSON
/// file next to the output and passed by path, keeping the command line
/// free of payload data. The binary is expected to exit non-zero on
/// failure with diagnostics on stderr.
pub struct CommandRenderer {
    binary: PathBuf,
}

impl CommandRenderer {
    /// Create a renderer driving the given binary.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn verify_installation(&self) -> Result<(), RenderError> {
        let result = std::process::Command::new(&self.binary)
            .arg("--version")
            .output();

        match result {
            Ok(output) if output.status.success() => Ok(()),
            Ok(_) => Err(RenderError::Failed {
                reason: format!(
                    "renderer binary {} found but returned error",
                    self.binary.display()
                ),
            }),
            Err(_) => Err(RenderError::Failed {
                reason: format!("renderer binary {} not found", self.binary.display()),
            }),
        }
    }
}

#[async_trait]
impl VideoRenderer for CommandRenderer {
    async fn render(
        &self,
        timeline: &Timeline,
        inputs: &RenderInputs,
        output_path: &Path,
        config: &RenderConfig,
    ) -> Result<RenderedVideo, RenderError> {
        let start_time = Instant::now();

        // Composition manifest lives next to the output, inside the
        // pipeline's temp workspace
        let manifest_path = output_path.with_file_name("composition.json");
        let manifest = serde_json::json!({
            "timeline": timeline,
            "inputs": inputs,
        });
        tokio::fs::write(&manifest_path, serde_json::to_vec(&manifest).map_err(|e| {
            RenderError::Failed {
                reason: format!("failed to serialize composition manifest: {e}"),
            }
        })?)
        .await?;

        tracing::info!(
            "Starting render: {} frames at {}fps -> {}",
            timeline.total_frames,
            timeline.fps,
            output_path.display()
        );

        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.arg("--composition")
            .arg(&manifest_path)
            .arg("--output")
            .arg(output_path)
            .arg("--codec")
            .arg("h264")
            .arg("--crf")
            .arg(config.crf.to_string())
            .arg("--pixel-format")
            .arg(config.pixel_format)
            .arg("--width")
            .arg(config.width.to_string())
            .arg("--height")
            .arg(config.height.to_string())
            .arg("--concurrency")
            .arg(config.concurrency.to_string());

        if let Some(audio) = &inputs.audio_path {
            cmd.arg("--audio").arg(audio);
        }

        tracing::debug!("Executing renderer command: {:?}", cmd);

        let output = match tokio::time::timeout(config.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| RenderError::Failed {
                reason: format!("failed to execute renderer: {e}"),
            })?,
            Err(_) => {
                return Err(RenderError::Timeout {
                    seconds: config.timeout.as_secs(),
                });
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            tracing::warn!("Renderer stderr: {}", stderr);
        }

        if !output.status.success() {
            tracing::error!(
                "Renderer failed with exit code {}: {}",
                output.status,
                stderr
            );
            return Err(RenderError::Failed {
                reason: format!("renderer exited with {}: {stderr}", output.status),
            });
        }

        let output_size = tokio::fs::metadata(output_path).await?.len();
        if output_size < 100 {
            return Err(RenderError::Failed {
                reason: format!("output file too small ({output_size} bytes), likely corrupt"),
            });
        }

        tracing::info!(
            "Rendered {} frames to {} ({} bytes) in {:.2}s",
            timeline.total_frames,
            output_path.display(),
            output_size,
            start_time.elapsed().as_secs_f64()
        );

        Ok(RenderedVideo {
            frames_rendered: timeline.total_frames,
            width: config.width,
            height: config.height,
            fps: timeline.fps,
        })
    }

    fn is_available(&self) -> bool {
        self.verify_installation().is_ok()
    }
}
