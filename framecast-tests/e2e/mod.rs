//! End-to-end tests for Framecast
//!
//! These tests drive the full HTTP API against the simulation renderer
//! and in-memory object store: submit a render, poll the job until it
//! terminates, then verify the artifact through the status endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use framecast_core::config::FramecastConfig;
use framecast_core::jobs::{JobRegistry, MemoryJobStore};
use framecast_core::pipeline::AssetPipeline;
use framecast_core::render::NullRenderer;
use framecast_core::storage::MemoryObjectStore;
use framecast_web::{AppState, router};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

fn test_app(renderer: NullRenderer, workspace_root: &std::path::Path) -> Router {
    let mut config = FramecastConfig::for_testing();
    config.pipeline.workspace_root = workspace_root.to_path_buf();
    let pipeline = AssetPipeline::new(
        Arc::new(renderer),
        Arc::new(MemoryObjectStore::new()),
        config,
    );
    let registry = JobRegistry::new(pipeline, Arc::new(MemoryJobStore::new()));
    router(AppState::new(registry))
}

fn script_json(total_duration: f64) -> Value {
    json!({
        "title": "Morning Focus",
        "subtitle": "Day 1",
        "segments": [
            {"type": "opening", "startTime": 0.0, "endTime": 3.0,
             "content": {"headline": "Welcome back"}},
            {"type": "reflection", "startTime": 3.0, "endTime": total_duration,
             "content": {"prompt": "What went well yesterday?"}}
        ],
        "totalDuration": total_duration
    })
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn poll_until_terminal(app: &Router, job_id: &str) -> Value {
    for _ in 0..200 {
        let (status, body) = get_json(app, &format!("/job-status/{job_id}")).await;
        assert_eq!(status, StatusCode::OK);
        match body["status"].as_str() {
            Some("completed") | Some("failed") => return body,
            _ => tokio::time::sleep(Duration::from_millis(10)).await,
        }
    }
    panic!("job {job_id} never reached a terminal state");
}

#[tokio::test]
async fn async_generation_workflow_end_to_end() {
    let root = TempDir::new().unwrap();
    let app = test_app(
        NullRenderer::new().with_delay(Duration::from_millis(50)),
        root.path(),
    );

    // Submit
    let (status, body) = post_json(
        &app,
        "/generate-video",
        json!({
            "sprintId": "sprint-e2e",
            "dayNumber": 1,
            "videoScript": script_json(10.0)
        }),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "processing");
    let job_id = body["jobId"].as_str().unwrap().to_string();
    assert!(job_id.starts_with("video-job-sprint-e2e-1-"));

    // Poll until the pipeline finishes
    let job = poll_until_terminal(&app, &job_id).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["progress"], 100);
    assert_eq!(job["fileName"], "sprint-e2e/day-1.mp4");
    assert!(job["videoUrl"].as_str().unwrap().ends_with("/sprint-e2e/day-1.mp4"));
    assert!(job["completedAt"].is_string());

    // Status endpoint sees the uploaded artifact
    let (status, body) = get_json(&app, "/video-status/sprint-e2e/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], true);
    assert_eq!(body["fileName"], "sprint-e2e/day-1.mp4");
}

#[tokio::test]
async fn failed_job_surfaces_error_through_api() {
    let root = TempDir::new().unwrap();
    let app = test_app(NullRenderer::new().failing(), root.path());

    let (status, body) = post_json(
        &app,
        "/generate-video",
        json!({
            "sprintId": "sprint-e2e",
            "dayNumber": 2,
            "videoScript": script_json(8.0)
        }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let job_id = body["jobId"].as_str().unwrap().to_string();
    let job = poll_until_terminal(&app, &job_id).await;

    assert_eq!(job["status"], "failed");
    assert!(job["error"].as_str().unwrap().contains("simulated render failure"));
    assert!(job["videoUrl"].is_null());

    // Nothing was uploaded
    let (_, body) = get_json(&app, "/video-status/sprint-e2e/2").await;
    assert_eq!(body["exists"], false);
}

#[tokio::test]
async fn sync_generation_returns_artifact_inline() {
    let root = TempDir::new().unwrap();
    let app = test_app(NullRenderer::new(), root.path());

    let (status, body) = post_json(
        &app,
        "/generate-video",
        json!({
            "sprintId": "sprint-e2e",
            "dayNumber": 3,
            "videoScript": script_json(6.0),
            "sync": true
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["fileName"], "sprint-e2e/day-3.mp4");
    assert_eq!(body["duration"], 6.0);
    assert_eq!(body["resolution"], "1920x1080");
}

#[tokio::test]
async fn bulk_generation_reports_per_item_outcomes() {
    let root = TempDir::new().unwrap();
    let app = test_app(NullRenderer::new().failing_for_day(2), root.path());

    let (status, body) = post_json(
        &app,
        "/generate-videos-bulk",
        json!({
            "sprintId": "sprint-e2e",
            "lessons": [
                {"day": 1, "videoScript": script_json(5.0)},
                {"day": 2, "videoScript": script_json(5.0)},
                {"day": 3, "videoScript": script_json(5.0)}
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["totalProcessed"], 3);
    assert_eq!(body["successCount"], 2);
    assert_eq!(body["errorCount"], 1);
    assert_eq!(body["message"], "Bulk generation complete: 2/3 successful");
    assert_eq!(body["results"][0]["day"], 1);
    assert_eq!(body["results"][1]["day"], 3);
    assert_eq!(body["errors"][0]["day"], 2);

    // Successful items are queryable afterwards
    let (_, day1) = get_json(&app, "/video-status/sprint-e2e/1").await;
    assert_eq!(day1["exists"], true);
    let (_, day2) = get_json(&app, "/video-status/sprint-e2e/2").await;
    assert_eq!(day2["exists"], false);
}

#[tokio::test]
async fn bulk_rejects_empty_lesson_list() {
    let root = TempDir::new().unwrap();
    let app = test_app(NullRenderer::new(), root.path());

    let (status, body) = post_json(
        &app,
        "/generate-videos-bulk",
        json!({"sprintId": "sprint-e2e", "lessons": []}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}
