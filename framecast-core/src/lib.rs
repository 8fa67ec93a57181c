//! Framecast Core - Script-to-video rendering pipeline
//!
//! This crate provides the building blocks for turning timed narrative
//! scripts into rendered video artifacts: timeline compilation, the asset
//! pipeline, job lifecycle tracking, bulk orchestration, and the renderer
//! and object-store abstractions they depend on.

pub mod bulk;
pub mod config;
pub mod jobs;
pub mod pipeline;
pub mod render;
pub mod script;
pub mod storage;
pub mod timeline;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use bulk::{BulkReport, FailurePolicy};
pub use config::FramecastConfig;
pub use jobs::{JobRegistry, JobStatus, JobStoreError, RenderJob};
pub use pipeline::{ArtifactInfo, PipelineError, RenderRequest};
pub use render::{RenderError, VideoRenderer};
pub use script::{BrandColors, Script, Segment, SegmentKind};
pub use storage::{ObjectStore, StorageError};
pub use timeline::{Timeline, TimelineError};

/// Core errors that can bubble up from any Framecast subsystem.
#[derive(Debug, thiserror::Error)]
pub enum FramecastError {
    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Job store error: {0}")]
    JobStore(#[from] JobStoreError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FramecastError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            FramecastError::Timeline(e) => format!("Invalid script: {e}"),
            FramecastError::Pipeline(e) => match e {
                PipelineError::Timeline(e) => format!("Invalid script: {e}"),
                PipelineError::AssetFetch { reason } => {
                    format!("Failed to download audio: {reason}")
                }
                PipelineError::Render(_) => "Video rendering failed".to_string(),
                PipelineError::Upload(_) => "Artifact upload failed".to_string(),
                PipelineError::Cancelled => "Render was cancelled".to_string(),
                _ => "Video generation failed".to_string(),
            },
            FramecastError::Storage(_) => "Storage error occurred".to_string(),
            FramecastError::JobStore(JobStoreError::NotFound { job_id }) => {
                format!("Job {job_id} not found")
            }
            FramecastError::JobStore(_) => "Job tracking error occurred".to_string(),
            FramecastError::Configuration { reason } => {
                format!("Configuration error: {reason}")
            }
            FramecastError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    ///
    /// Timeline errors count whether they arrive directly or wrapped by
    /// the pipeline; segment timing is caller input either way.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            FramecastError::Timeline(_)
                | FramecastError::Configuration { .. }
                | FramecastError::Pipeline(PipelineError::InvalidRequest { .. })
                | FramecastError::Pipeline(PipelineError::Timeline(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, FramecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_wrapped_timeline_error_is_user_error() {
        let error = FramecastError::Pipeline(PipelineError::Timeline(
            TimelineError::EmptyScript,
        ));
        assert!(error.is_user_error());
        assert!(error.user_message().starts_with("Invalid script"));
    }

    #[test]
    fn test_infrastructure_failures_are_not_user_errors() {
        let render = FramecastError::Pipeline(PipelineError::Render(
            RenderError::Failed {
                reason: "renderer crashed".to_string(),
            },
        ));
        assert!(!render.is_user_error());

        let storage = FramecastError::Storage(StorageError::Backend {
            reason: "disk full".to_string(),
        });
        assert!(!storage.is_user_error());
    }
}
