//! Bulk orchestration tests: per-item failure isolation and report
//! invariants.

use std::sync::Arc;

use framecast_core::bulk::{BulkItem, BulkOrchestrator, BulkRequest, FailurePolicy};
use framecast_core::config::FramecastConfig;
use framecast_core::pipeline::AssetPipeline;
use framecast_core::render::NullRenderer;
use framecast_core::script::{BrandColors, Script, Segment, SegmentKind};
use framecast_core::storage::{MemoryObjectStore, ObjectStore};
use tempfile::TempDir;

fn lesson_script(day: u32) -> Script {
    Script {
        title: format!("Day {day}"),
        subtitle: None,
        segments: vec![
            Segment {
                kind: SegmentKind::Opening,
                start_time: 0.0,
                end_time: 4.0,
                content: serde_json::Value::Null,
            },
            Segment {
                kind: SegmentKind::Affirmation,
                start_time: 4.0,
                end_time: 10.0,
                content: serde_json::Value::Null,
            },
        ],
        total_duration: 10.0,
        audio_file: None,
    }
}

fn bulk_request(days: &[u32]) -> BulkRequest {
    BulkRequest {
        sprint_id: "sprint-bulk".to_string(),
        items: days
            .iter()
            .map(|&day| BulkItem {
                day,
                script: lesson_script(day),
            })
            .collect(),
        brand_colors: BrandColors::default(),
    }
}

fn build_orchestrator(
    renderer: NullRenderer,
    workspace_root: &std::path::Path,
) -> (BulkOrchestrator, MemoryObjectStore) {
    let store = MemoryObjectStore::new();
    let mut config = FramecastConfig::for_testing();
    config.pipeline.workspace_root = workspace_root.to_path_buf();
    let pipeline = AssetPipeline::new(Arc::new(renderer), Arc::new(store.clone()), config);
    (BulkOrchestrator::new(pipeline), store)
}

#[tokio::test]
async fn middle_item_failure_never_halts_batch() {
    let root = TempDir::new().unwrap();
    let (orchestrator, store) =
        build_orchestrator(NullRenderer::new().failing_for_day(2), root.path());

    let report = orchestrator
        .run(&bulk_request(&[1, 2, 3]), FailurePolicy::ContinueOnError)
        .await;

    assert_eq!(report.total_processed, 3);
    assert_eq!(report.success_count, 2);
    assert_eq!(report.error_count, 1);

    let successful_days: Vec<u32> = report.results.iter().map(|r| r.day).collect();
    assert_eq!(successful_days, vec![1, 3]);
    assert_eq!(report.errors[0].day, 2);
    assert!(report.errors[0].error.contains("simulated render failure"));

    // Items 1 and 3 persisted, item 2 absent
    assert!(store.exists("sprint-bulk/day-1.mp4").await.unwrap());
    assert!(!store.exists("sprint-bulk/day-2.mp4").await.unwrap());
    assert!(store.exists("sprint-bulk/day-3.mp4").await.unwrap());
}

#[tokio::test]
async fn failed_batch_leaves_no_workspaces_behind() {
    let root = TempDir::new().unwrap();
    let (orchestrator, _) = build_orchestrator(NullRenderer::new().failing(), root.path());

    let report = orchestrator
        .run(&bulk_request(&[1, 2]), FailurePolicy::ContinueOnError)
        .await;

    assert_eq!(report.error_count, 2);
    let leftovers: Vec<_> = std::fs::read_dir(root.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "workspaces leaked: {leftovers:?}");
}

#[tokio::test]
async fn report_counts_always_reconcile() {
    let root = TempDir::new().unwrap();
    let (orchestrator, _) =
        build_orchestrator(NullRenderer::new().failing_for_day(3), root.path());

    for policy in [FailurePolicy::ContinueOnError, FailurePolicy::AbortOnError] {
        let report = orchestrator.run(&bulk_request(&[1, 2, 3, 4]), policy).await;
        assert_eq!(
            report.success_count + report.error_count,
            report.total_processed,
            "invariant violated under {policy:?}"
        );
    }
}

#[tokio::test]
async fn abort_policy_skips_remaining_items() {
    let root = TempDir::new().unwrap();
    let (orchestrator, store) =
        build_orchestrator(NullRenderer::new().failing_for_day(2), root.path());

    let report = orchestrator
        .run(&bulk_request(&[1, 2, 3]), FailurePolicy::AbortOnError)
        .await;

    assert_eq!(report.total_processed, 2);
    assert_eq!(report.success_count, 1);
    assert_eq!(report.error_count, 1);
    assert!(!store.exists("sprint-bulk/day-3.mp4").await.unwrap());
}
