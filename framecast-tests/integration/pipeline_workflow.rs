//! Pipeline workflow tests: cleanup guarantees and upload idempotence.

use std::path::Path;
use std::sync::Arc;

use framecast_core::config::FramecastConfig;
use framecast_core::pipeline::{AssetPipeline, CancelToken, PipelineError, RenderRequest};
use framecast_core::render::NullRenderer;
use framecast_core::script::{BrandColors, Script, Segment, SegmentKind};
use framecast_core::storage::{MemoryObjectStore, ObjectStore};
use tempfile::TempDir;

fn sample_script(total_duration: f64) -> Script {
    Script {
        title: "Integration Day".to_string(),
        subtitle: Some("Day 1".to_string()),
        segments: vec![
            Segment {
                kind: SegmentKind::Opening,
                start_time: 0.0,
                end_time: 5.0,
                content: serde_json::json!({"headline": "Welcome"}),
            },
            Segment {
                kind: SegmentKind::Introduction,
                start_time: 5.0,
                end_time: total_duration,
                content: serde_json::json!({"body": "Today we begin"}),
            },
        ],
        total_duration,
        audio_file: None,
    }
}

fn sample_request(sprint: &str, day: u32) -> RenderRequest {
    RenderRequest {
        sprint_id: sprint.to_string(),
        day_number: day,
        script: sample_script(12.0),
        brand_colors: BrandColors::default(),
    }
}

fn build_pipeline(
    renderer: NullRenderer,
    workspace_root: &Path,
) -> (AssetPipeline, MemoryObjectStore) {
    let store = MemoryObjectStore::new();
    let mut config = FramecastConfig::for_testing();
    config.pipeline.workspace_root = workspace_root.to_path_buf();
    let pipeline = AssetPipeline::new(Arc::new(renderer), Arc::new(store.clone()), config);
    (pipeline, store)
}

#[tokio::test]
async fn workspace_absent_after_successful_run() {
    let root = TempDir::new().unwrap();
    let (pipeline, _) = build_pipeline(NullRenderer::new(), root.path());

    pipeline
        .render_video(&sample_request("sprint-int", 1), None, &CancelToken::never())
        .await
        .unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(root.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "workspace not cleaned up: {leftovers:?}");
}

#[tokio::test]
async fn workspace_absent_after_render_failure() {
    let root = TempDir::new().unwrap();
    let (pipeline, store) = build_pipeline(NullRenderer::new().failing(), root.path());

    let result = pipeline
        .render_video(&sample_request("sprint-int", 1), None, &CancelToken::never())
        .await;

    assert!(matches!(result, Err(PipelineError::Render(_))));
    assert!(store.is_empty().await);

    let leftovers: Vec<_> = std::fs::read_dir(root.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "workspace not cleaned up: {leftovers:?}");
}

#[tokio::test]
async fn second_generation_overwrites_first_artifact() {
    let root = TempDir::new().unwrap();
    let (pipeline, store) = build_pipeline(NullRenderer::new(), root.path());

    // First render: short script
    let mut request = sample_request("sprint-int", 2);
    request.script = sample_script(8.0);
    let first = pipeline
        .render_video(&request, None, &CancelToken::never())
        .await
        .unwrap();

    // Second render under the same identity: longer script
    request.script = sample_script(20.0);
    let second = pipeline
        .render_video(&request, None, &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(first.file_name, second.file_name);
    assert_eq!(store.len().await, 1);

    // Stored bytes reflect only the latest artifact
    let entries = store.list("sprint-int/").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].size, second.file_size_bytes);
    assert_ne!(first.file_size_bytes, second.file_size_bytes);
}

#[tokio::test]
async fn artifact_metadata_matches_timeline() {
    let root = TempDir::new().unwrap();
    let (pipeline, _) = build_pipeline(NullRenderer::new(), root.path());

    let artifact = pipeline
        .render_video(&sample_request("sprint-int", 3), None, &CancelToken::never())
        .await
        .unwrap();

    // 12s at 30fps, duration derived from rendered frames
    assert_eq!(artifact.duration_seconds, 12.0);
    assert_eq!(artifact.resolution, "1920x1080");
    assert_eq!(artifact.file_name, "sprint-int/day-3.mp4");
    assert!(artifact.url.ends_with("/sprint-int/day-3.mp4"));
}
