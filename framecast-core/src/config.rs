//! Centralized configuration for Framecast.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::path::PathBuf;
use std::time::Duration;

use crate::timeline::OverrunPolicy;

/// Central configuration for all Framecast components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct FramecastConfig {
    pub render: RenderConfig,
    pub pipeline: PipelineConfig,
    pub storage: StorageConfig,
}

/// Renderer invocation configuration.
///
/// Controls the output profile and resource budget of the external
/// renderer. The defaults match the reference composition: 1080p at
/// 30 fps, constant-quality H.264.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Frames per second of the output composition
    pub fps: u32,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Constant rate factor for H.264 encoding (lower = higher quality)
    pub crf: u8,
    /// Pixel format requested from the encoder
    pub pixel_format: &'static str,
    /// Parallel render workers per job
    pub concurrency: usize,
    /// Maximum wall-clock time for a single render invocation
    pub timeout: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            width: 1920,
            height: 1080,
            crf: 18,
            pixel_format: "yuv420p",
            concurrency: 2,
            timeout: Duration::from_secs(600), // 10 minutes
        }
    }
}

/// Asset pipeline configuration.
///
/// Controls workspace placement, audio download behavior, and how
/// segment timing that overruns the declared duration is handled.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root directory for per-job temporary workspaces
    pub workspace_root: PathBuf,
    /// Timeout for downloading the script's audio track
    pub audio_timeout: Duration,
    /// Estimated job duration reported to polling clients, in seconds
    pub estimated_seconds: u64,
    /// Policy for segments extending past the declared total duration
    pub overrun_policy: OverrunPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workspace_root: std::env::temp_dir(),
            audio_timeout: Duration::from_secs(30),
            estimated_seconds: 300, // 5 minutes
            overrun_policy: OverrunPolicy::Truncate,
        }
    }
}

/// Artifact storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for the filesystem-backed object store
    pub root: PathBuf,
    /// Base URL under which stored objects are publicly reachable
    pub public_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./artifacts"),
            public_base_url: "http://127.0.0.1:3001/artifacts".to_string(),
        }
    }
}

impl FramecastConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(fps) = std::env::var("FRAMECAST_FPS") {
            if let Ok(value) = fps.parse::<u32>() {
                config.render.fps = value;
            }
        }

        if let Ok(workers) = std::env::var("FRAMECAST_RENDER_CONCURRENCY") {
            if let Ok(count) = workers.parse::<usize>() {
                config.render.concurrency = count;
            }
        }

        if let Ok(timeout) = std::env::var("FRAMECAST_RENDER_TIMEOUT") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.render.timeout = Duration::from_secs(seconds);
            }
        }

        if let Ok(timeout) = std::env::var("FRAMECAST_AUDIO_TIMEOUT") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.pipeline.audio_timeout = Duration::from_secs(seconds);
            }
        }

        if let Ok(policy) = std::env::var("FRAMECAST_OVERRUN_POLICY") {
            match policy.to_lowercase().as_str() {
                "reject" => config.pipeline.overrun_policy = OverrunPolicy::Reject,
                "truncate" => config.pipeline.overrun_policy = OverrunPolicy::Truncate,
                _ => {}
            }
        }

        if let Ok(root) = std::env::var("FRAMECAST_STORAGE_ROOT") {
            config.storage.root = PathBuf::from(root);
        }

        if let Ok(base) = std::env::var("FRAMECAST_PUBLIC_BASE_URL") {
            config.storage.public_base_url = base;
        }

        config
    }

    /// Creates a configuration optimized for testing.
    ///
    /// Short timeouts and a strict overrun policy so bad fixtures fail
    /// fast instead of hanging the suite.
    pub fn for_testing() -> Self {
        let mut config = Self::default();
        config.render.timeout = Duration::from_secs(5);
        config.pipeline.audio_timeout = Duration::from_secs(2);
        config.pipeline.estimated_seconds = 1;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = FramecastConfig::default();

        assert_eq!(config.render.fps, 30);
        assert_eq!(config.render.width, 1920);
        assert_eq!(config.render.height, 1080);
        assert_eq!(config.render.crf, 18);
        assert_eq!(config.render.pixel_format, "yuv420p");
        assert_eq!(config.render.concurrency, 2);
        assert_eq!(config.pipeline.audio_timeout, Duration::from_secs(30));
        assert_eq!(config.pipeline.estimated_seconds, 300);
        assert_eq!(config.pipeline.overrun_policy, OverrunPolicy::Truncate);
    }

    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("FRAMECAST_RENDER_CONCURRENCY", "4");
            std::env::set_var("FRAMECAST_AUDIO_TIMEOUT", "10");
            std::env::set_var("FRAMECAST_OVERRUN_POLICY", "reject");
        }

        let config = FramecastConfig::from_env();

        assert_eq!(config.render.concurrency, 4);
        assert_eq!(config.pipeline.audio_timeout, Duration::from_secs(10));
        assert_eq!(config.pipeline.overrun_policy, OverrunPolicy::Reject);

        // Cleanup
        unsafe {
            std::env::remove_var("FRAMECAST_RENDER_CONCURRENCY");
            std::env::remove_var("FRAMECAST_AUDIO_TIMEOUT");
            std::env::remove_var("FRAMECAST_OVERRUN_POLICY");
        }
    }

    #[test]
    fn test_testing_preset() {
        let config = FramecastConfig::for_testing();
        assert!(config.render.timeout < Duration::from_secs(30));
        assert_eq!(config.pipeline.estimated_seconds, 1);
    }
}
