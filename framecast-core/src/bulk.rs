//! Bulk orchestration: many render requests, one aggregate report.
//!
//! Items are processed strictly sequentially to avoid oversubscribing the
//! renderer's own concurrency budget. One item's failure never corrupts
//! or aborts the rest of the batch unless the caller opts into
//! [`FailurePolicy::AbortOnError`].

use serde::{Deserialize, Serialize};

use crate::pipeline::{AssetPipeline, CancelToken, RenderRequest};
use crate::script::{BrandColors, Script};

/// What to do with the remainder of a batch after an item fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Record the failure and keep going (reference behavior)
    #[default]
    ContinueOnError,
    /// Stop after the first failure; unprocessed items are not reported
    AbortOnError,
}

/// One batch item: a day number and its script.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkItem {
    pub day: u32,
    #[serde(rename = "videoScript")]
    pub script: Script,
}

/// A bulk render request covering several days of one sprint.
#[derive(Debug, Clone)]
pub struct BulkRequest {
    pub sprint_id: String,
    pub items: Vec<BulkItem>,
    pub brand_colors: BrandColors,
}

/// Per-item success record.
#[derive(Debug, Clone, Serialize)]
pub struct BulkSuccess {
    pub day: u32,
    pub success: bool,
    #[serde(rename = "videoUrl")]
    pub url: String,
    pub duration: f64,
}

/// Per-item failure record.
#[derive(Debug, Clone, Serialize)]
pub struct BulkFailure {
    pub day: u32,
    pub error: String,
}

/// Aggregate outcome of a bulk run.
///
/// Invariant: `success_count + error_count == total_processed`.
#[derive(Debug, Clone, Serialize)]
pub struct BulkReport {
    pub results: Vec<BulkSuccess>,
    pub errors: Vec<BulkFailure>,
    #[serde(rename = "totalProcessed")]
    pub total_processed: usize,
    #[serde(rename = "successCount")]
    pub success_count: usize,
    #[serde(rename = "errorCount")]
    pub error_count: usize,
}

impl BulkReport {
    /// Human-readable summary line for API responses.
    pub fn message(&self) -> String {
        format!(
            "Bulk generation complete: {}/{} successful",
            self.success_count, self.total_processed
        )
    }
}

/// Drives the asset pipeline over a batch, one item at a time.
///
/// Bulk items bypass the job registry: the caller gets the aggregate
/// report instead of per-item job ids.
pub struct BulkOrchestrator {
    pipeline: AssetPipeline,
}

impl BulkOrchestrator {
    pub fn new(pipeline: AssetPipeline) -> Self {
        Self { pipeline }
    }

    /// Runs the batch sequentially and folds per-item outcomes into a
    /// report.
    pub async fn run(&self, request: &BulkRequest, policy: FailurePolicy) -> BulkReport {
        tracing::info!(
            "Starting bulk generation for sprint {} ({} items)",
            request.sprint_id,
            request.items.len()
        );

        let mut results = Vec::new();
        let mut errors = Vec::new();

        for item in &request.items {
            let render_request = RenderRequest {
                sprint_id: request.sprint_id.clone(),
                day_number: item.day,
                script: item.script.clone(),
                brand_colors: request.brand_colors.clone(),
            };

            match self
                .pipeline
                .render_video(&render_request, None, &CancelToken::never())
                .await
            {
                Ok(artifact) => {
                    tracing::info!("Day {} complete: {}", item.day, artifact.url);
                    results.push(BulkSuccess {
                        day: item.day,
                        success: true,
                        url: artifact.url,
                        duration: artifact.duration_seconds,
                    });
                }
                Err(e) => {
                    tracing::error!("Day {} failed: {}", item.day, e);
                    errors.push(BulkFailure {
                        day: item.day,
                        error: e.to_string(),
                    });
                    if policy == FailurePolicy::AbortOnError {
                        break;
                    }
                }
            }
        }

        let report = BulkReport {
            total_processed: results.len() + errors.len(),
            success_count: results.len(),
            error_count: errors.len(),
            results,
            errors,
        };

        tracing::info!("{}", report.message());
        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::tempdir;

    use super::*;
    use crate::config::FramecastConfig;
    use crate::render::NullRenderer;
    use crate::script::{Segment, SegmentKind};
    use crate::storage::{MemoryObjectStore, ObjectStore};

    fn script() -> Script {
        Script {
            title: "Lesson".to_string(),
            subtitle: None,
            segments: vec![Segment {
                kind: SegmentKind::Opening,
                start_time: 0.0,
                end_time: 3.0,
                content: serde_json::Value::Null,
            }],
            total_duration: 3.0,
            audio_file: None,
        }
    }

    fn bulk_request(days: &[u32]) -> BulkRequest {
        BulkRequest {
            sprint_id: "sprint-9".to_string(),
            items: days
                .iter()
                .map(|&day| BulkItem {
                    day,
                    script: script(),
                })
                .collect(),
            brand_colors: BrandColors::default(),
        }
    }

    fn orchestrator(
        renderer: NullRenderer,
        workspace_root: &std::path::Path,
    ) -> (BulkOrchestrator, MemoryObjectStore) {
        let store = MemoryObjectStore::new();
        let mut config = FramecastConfig::for_testing();
        config.pipeline.workspace_root = workspace_root.to_path_buf();
        let pipeline =
            AssetPipeline::new(Arc::new(renderer), Arc::new(store.clone()), config);
        (BulkOrchestrator::new(pipeline), store)
    }

    #[tokio::test]
    async fn test_all_items_succeed() {
        let root = tempdir().unwrap();
        let (orchestrator, store) = orchestrator(NullRenderer::new(), root.path());

        let report = orchestrator
            .run(&bulk_request(&[1, 2, 3]), FailurePolicy::ContinueOnError)
            .await;

        assert_eq!(report.total_processed, 3);
        assert_eq!(report.success_count, 3);
        assert_eq!(report.error_count, 0);
        assert_eq!(store.len().await, 3);
        assert_eq!(report.message(), "Bulk generation complete: 3/3 successful");
    }

    #[tokio::test]
    async fn test_middle_failure_is_isolated() {
        let root = tempdir().unwrap();
        let (orchestrator, store) =
            orchestrator(NullRenderer::new().failing_for_day(2), root.path());

        let report = orchestrator
            .run(&bulk_request(&[1, 2, 3]), FailurePolicy::ContinueOnError)
            .await;

        assert_eq!(report.total_processed, 3);
        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.results[0].day, 1);
        assert_eq!(report.results[1].day, 3);
        assert_eq!(report.errors[0].day, 2);

        assert!(store.exists("sprint-9/day-1.mp4").await.unwrap());
        assert!(!store.exists("sprint-9/day-2.mp4").await.unwrap());
        assert!(store.exists("sprint-9/day-3.mp4").await.unwrap());
    }

    #[tokio::test]
    async fn test_abort_policy_stops_after_failure() {
        let root = tempdir().unwrap();
        let (orchestrator, store) =
            orchestrator(NullRenderer::new().failing_for_day(2), root.path());

        let report = orchestrator
            .run(&bulk_request(&[1, 2, 3]), FailurePolicy::AbortOnError)
            .await;

        assert_eq!(report.total_processed, 2);
        assert_eq!(report.success_count, 1);
        assert_eq!(report.error_count, 1);
        assert!(!store.exists("sprint-9/day-3.mp4").await.unwrap());
    }

    #[tokio::test]
    async fn test_count_invariant_holds() {
        let root = tempdir().unwrap();
        let (orchestrator, _) =
            orchestrator(NullRenderer::new().failing_for_day(1), root.path());

        let report = orchestrator
            .run(&bulk_request(&[1, 2]), FailurePolicy::ContinueOnError)
            .await;

        assert_eq!(
            report.success_count + report.error_count,
            report.total_processed
        );
    }
}
