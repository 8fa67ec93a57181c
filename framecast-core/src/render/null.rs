//! Simulation renderer for testing and development mode.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use super::{RenderError, RenderInputs, RenderedVideo, VideoRenderer};
use crate::config::RenderConfig;
use crate::timeline::Timeline;

/// Renderer that writes a stub MP4 instead of driving a real engine.
///
/// Produces deterministic output sized to the frame count, with optional
/// artificial delay and injectable failures for exercising the pipeline's
/// error and cleanup paths.
pub struct NullRenderer {
    delay: Duration,
    fail_all: bool,
    fail_for_day: Option<u32>,
}

impl NullRenderer {
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
            fail_all: false,
            fail_for_day: None,
        }
    }

    /// Add an artificial delay per render, for lifecycle tests that need
    /// to observe a job mid-flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail every render.
    pub fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Fail only renders for the given day number.
    pub fn failing_for_day(mut self, day: u32) -> Self {
        self.fail_for_day = Some(day);
        self
    }
}

impl Default for NullRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoRenderer for NullRenderer {
    async fn render(
        &self,
        timeline: &Timeline,
        inputs: &RenderInputs,
        output_path: &Path,
        config: &RenderConfig,
    ) -> Result<RenderedVideo, RenderError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.fail_all || self.fail_for_day == Some(inputs.day_number) {
            return Err(RenderError::Failed {
                reason: format!(
                    "simulated render failure for {}/day-{}",
                    inputs.sprint_id, inputs.day_number
                ),
            });
        }

        // Minimal ftyp box followed by padding proportional to the frame
        // count, so file sizes vary plausibly across scripts
        let mut bytes = Vec::with_capacity(1024);
        bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x18]);
        bytes.extend_from_slice(b"ftypisom");
        bytes.extend_from_slice(&[0x00, 0x00, 0x02, 0x00]);
        bytes.extend_from_slice(b"isomiso2");
        bytes.resize(bytes.len() + (timeline.total_frames as usize) * 16, 0);

        tokio::fs::write(output_path, &bytes).await?;

        Ok(RenderedVideo {
            frames_rendered: timeline.total_frames,
            width: config.width,
            height: config.height,
            fps: timeline.fps,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::script::{BrandColors, Script, Segment, SegmentKind};
    use crate::timeline::OverrunPolicy;

    fn inputs(day: u32) -> (Timeline, RenderInputs) {
        let script = Script {
            title: "Test".to_string(),
            subtitle: None,
            segments: vec![Segment {
                kind: SegmentKind::Opening,
                start_time: 0.0,
                end_time: 5.0,
                content: serde_json::Value::Null,
            }],
            total_duration: 5.0,
            audio_file: None,
        };
        let timeline = Timeline::compile(&script, 30, OverrunPolicy::Truncate).unwrap();
        let inputs = RenderInputs {
            script,
            brand_colors: BrandColors::default(),
            sprint_id: "sprint-1".to_string(),
            day_number: day,
            audio_path: None,
        };
        (timeline, inputs)
    }

    #[tokio::test]
    async fn test_null_renderer_writes_output() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.mp4");
        let (timeline, inputs) = inputs(1);
        let config = RenderConfig::default();

        let rendered = NullRenderer::new()
            .render(&timeline, &inputs, &output, &config)
            .await
            .unwrap();

        assert_eq!(rendered.frames_rendered, 150);
        assert_eq!(rendered.resolution(), "1920x1080");
        assert_eq!(rendered.duration_seconds(), 5.0);

        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(&bytes[4..8], b"ftyp");
    }

    #[tokio::test]
    async fn test_null_renderer_day_scoped_failure() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.mp4");
        let config = RenderConfig::default();
        let renderer = NullRenderer::new().failing_for_day(2);

        let (timeline, inputs_ok) = inputs(1);
        assert!(
            renderer
                .render(&timeline, &inputs_ok, &output, &config)
                .await
                .is_ok()
        );

        let (timeline, inputs_bad) = inputs(2);
        let result = renderer.render(&timeline, &inputs_bad, &output, &config).await;
        assert!(matches!(result, Err(RenderError::Failed { .. })));
    }
}
