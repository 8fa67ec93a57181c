//! Job lifecycle tests: state machine transitions observed through the
//! registry while the pipeline runs concurrently.

use std::sync::Arc;
use std::time::Duration;

use framecast_core::config::FramecastConfig;
use framecast_core::jobs::{JobRegistry, JobStatus, MemoryJobStore, RenderJob};
use framecast_core::pipeline::{AssetPipeline, RenderRequest};
use framecast_core::render::NullRenderer;
use framecast_core::script::{BrandColors, Script, Segment, SegmentKind};
use framecast_core::storage::MemoryObjectStore;
use tempfile::TempDir;

fn sample_request() -> RenderRequest {
    RenderRequest {
        sprint_id: "sprint-life".to_string(),
        day_number: 4,
        script: Script {
            title: "Lifecycle Day".to_string(),
            subtitle: None,
            segments: vec![Segment {
                kind: SegmentKind::Opening,
                start_time: 0.0,
                end_time: 6.0,
                content: serde_json::Value::Null,
            }],
            total_duration: 6.0,
            audio_file: None,
        },
        brand_colors: BrandColors::default(),
    }
}

fn build_registry(renderer: NullRenderer, workspace_root: &std::path::Path) -> JobRegistry {
    let mut config = FramecastConfig::for_testing();
    config.pipeline.workspace_root = workspace_root.to_path_buf();
    let pipeline = AssetPipeline::new(
        Arc::new(renderer),
        Arc::new(MemoryObjectStore::new()),
        config,
    );
    JobRegistry::new(pipeline, Arc::new(MemoryJobStore::new()))
}

async fn wait_terminal(registry: &JobRegistry, job_id: &str) -> RenderJob {
    for _ in 0..200 {
        let job = registry.job(job_id).await.unwrap();
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never reached a terminal state");
}

#[tokio::test]
async fn job_visible_immediately_after_start() {
    let root = TempDir::new().unwrap();
    let registry = build_registry(
        NullRenderer::new().with_delay(Duration::from_millis(200)),
        root.path(),
    );

    let job_id = registry.start_job(sample_request()).await.unwrap();

    // Right after submission the job is queued or already processing
    let job = registry.job(&job_id).await.unwrap();
    assert!(
        matches!(job.status, JobStatus::Queued | JobStatus::Processing),
        "unexpected early status: {:?}",
        job.status
    );
    assert!(job.progress <= 90);
    assert!(job.result.is_none());
}

#[tokio::test]
async fn completed_job_reports_artifact_url() {
    let root = TempDir::new().unwrap();
    let registry = build_registry(NullRenderer::new(), root.path());

    let job_id = registry.start_job(sample_request()).await.unwrap();
    let job = wait_terminal(&registry, &job_id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    assert!(job.completed_at.is_some());

    let artifact = job.result.expect("completed job must carry a result");
    assert!(!artifact.url.is_empty());
    assert_eq!(artifact.file_name, "sprint-life/day-4.mp4");
}

#[tokio::test]
async fn progress_is_monotonic_while_processing() {
    let root = TempDir::new().unwrap();
    let registry = build_registry(
        NullRenderer::new().with_delay(Duration::from_millis(100)),
        root.path(),
    );

    let job_id = registry.start_job(sample_request()).await.unwrap();

    let mut last_progress = 0u8;
    loop {
        let job = registry.job(&job_id).await.unwrap();
        assert!(
            job.progress >= last_progress,
            "progress went backwards: {} -> {}",
            last_progress,
            job.progress
        );
        last_progress = job.progress;
        if job.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(last_progress, 100);
}

#[tokio::test]
async fn concurrent_jobs_track_independently() {
    let root = TempDir::new().unwrap();
    let registry = build_registry(NullRenderer::new().failing_for_day(5), root.path());

    let ok_id = registry.start_job(sample_request()).await.unwrap();

    let mut failing = sample_request();
    failing.day_number = 5;
    let failing_id = registry.start_job(failing).await.unwrap();

    let ok_job = wait_terminal(&registry, &ok_id).await;
    let failed_job = wait_terminal(&registry, &failing_id).await;

    assert_eq!(ok_job.status, JobStatus::Completed);
    assert_eq!(failed_job.status, JobStatus::Failed);
    assert!(failed_job.error.unwrap().contains("simulated render failure"));
}
