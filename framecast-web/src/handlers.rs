//! API handlers for video generation and job polling.
//!
//! All responses are JSON with a `success` flag; internal error kinds map
//! to 400 for invalid input, 404 for missing resources, and 500 for
//! pipeline or storage failures. Clients never see a stack trace.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use framecast_core::FramecastError;
use framecast_core::bulk::{BulkItem, BulkOrchestrator, BulkRequest, FailurePolicy};
use framecast_core::jobs::JobStoreError;
use framecast_core::pipeline::{CancelToken, RenderRequest};
use framecast_core::script::{BrandColors, Script};
use framecast_core::storage::artifact_key;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::server::AppState;

/// API error carrying an HTTP status and a client-safe message.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<FramecastError> for ApiError {
    fn from(error: FramecastError) -> Self {
        let status = if error.is_user_error() {
            StatusCode::BAD_REQUEST
        } else if matches!(
            error,
            FramecastError::JobStore(JobStoreError::NotFound { .. })
        ) {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "error": self.message,
        }));
        (self.status, body).into_response()
    }
}

/// Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "Framecast Video Service",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoBody {
    sprint_id: String,
    day_number: u32,
    video_script: Script,
    #[serde(default)]
    brand_colors: Option<BrandColors>,
    /// Render inline instead of returning a job id
    #[serde(default)]
    sync: bool,
}

impl GenerateVideoBody {
    fn into_request(self) -> (RenderRequest, bool) {
        let request = RenderRequest {
            sprint_id: self.sprint_id,
            day_number: self.day_number,
            script: self.video_script,
            brand_colors: self.brand_colors.unwrap_or_default(),
        };
        (request, self.sync)
    }
}

/// Submits a render request.
///
/// Default behavior creates a job and returns 202 immediately; with
/// `"sync": true` the pipeline runs inline and the response carries the
/// artifact fields.
pub async fn generate_video(
    State(state): State<AppState>,
    Json(body): Json<GenerateVideoBody>,
) -> Result<Response, ApiError> {
    let (request, sync) = body.into_request();

    if sync {
        let artifact = state
            .registry
            .pipeline()
            .render_video(&request, None, &CancelToken::never())
            .await
            .map_err(FramecastError::Pipeline)?;

        let mut response = serde_json::to_value(&artifact).unwrap_or_default();
        if let Value::Object(map) = &mut response {
            map.insert("success".to_string(), json!(true));
        }
        return Ok(Json(response).into_response());
    }

    let job_id = state.registry.start_job(request).await?;
    let estimated = state
        .registry
        .pipeline()
        .config()
        .pipeline
        .estimated_seconds;

    let body = Json(json!({
        "success": true,
        "jobId": job_id,
        "status": "processing",
        "estimatedTime": estimated,
        "message": "Video generation started. Use the job ID to check progress.",
    }));
    Ok((StatusCode::ACCEPTED, body).into_response())
}

/// Returns the tracked state of an asynchronous render job.
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let job = state.registry.job(&job_id).await?;

    let mut body = serde_json::to_value(&job).unwrap_or_default();
    if let Value::Object(map) = &mut body {
        map.insert("success".to_string(), json!(true));
        // Completed jobs surface artifact fields at the top level
        if let Some(Value::Object(result)) = map.remove("result") {
            for (key, value) in result {
                map.insert(key, value);
            }
        }
    }
    Ok(Json(body))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkBody {
    sprint_id: String,
    lessons: Vec<BulkItem>,
    #[serde(default)]
    brand_colors: Option<BrandColors>,
}

/// Renders several lessons sequentially and reports per-item outcomes.
pub async fn generate_videos_bulk(
    State(state): State<AppState>,
    Json(body): Json<BulkBody>,
) -> Result<Json<Value>, ApiError> {
    if body.sprint_id.trim().is_empty() {
        return Err(ApiError::bad_request("sprintId must not be empty"));
    }
    if body.lessons.is_empty() {
        return Err(ApiError::bad_request("lessons must not be empty"));
    }

    let request = BulkRequest {
        sprint_id: body.sprint_id,
        items: body.lessons,
        brand_colors: body.brand_colors.unwrap_or_default(),
    };

    let orchestrator = BulkOrchestrator::new(state.registry.pipeline().clone());
    let report = orchestrator.run(&request, FailurePolicy::ContinueOnError).await;

    let mut body = serde_json::to_value(&report).unwrap_or_default();
    if let Value::Object(map) = &mut body {
        map.insert("success".to_string(), json!(true));
        map.insert("message".to_string(), json!(report.message()));
    }
    Ok(Json(body))
}

/// Reports whether the artifact for a sprint/day already exists in
/// durable storage.
pub async fn video_status(
    State(state): State<AppState>,
    Path((sprint_id, day_number)): Path<(String, u32)>,
) -> Result<Json<Value>, ApiError> {
    if sprint_id.contains(['/', '\\']) || sprint_id == "." || sprint_id == ".." {
        return Err(ApiError::bad_request(
            "sprintId must not contain path separators",
        ));
    }

    let key = artifact_key(&sprint_id, day_number);
    let store = state.store();

    let exists = store
        .exists(&key)
        .await
        .map_err(FramecastError::Storage)?;

    if exists {
        Ok(Json(json!({
            "success": true,
            "exists": true,
            "videoUrl": store.public_url(&key),
            "fileName": key,
        })))
    } else {
        Ok(Json(json!({
            "success": true,
            "exists": false,
            "message": "Video not found",
        })))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use framecast_core::config::FramecastConfig;
    use framecast_core::jobs::{JobRegistry, MemoryJobStore};
    use framecast_core::pipeline::AssetPipeline;
    use framecast_core::render::NullRenderer;
    use framecast_core::storage::MemoryObjectStore;
    use tower::ServiceExt;

    use super::*;
    use crate::server::router;

    fn test_state(workspace_root: &std::path::Path) -> AppState {
        let mut config = FramecastConfig::for_testing();
        config.pipeline.workspace_root = workspace_root.to_path_buf();
        let pipeline = AssetPipeline::new(
            Arc::new(NullRenderer::new()),
            Arc::new(MemoryObjectStore::new()),
            config,
        );
        AppState::new(JobRegistry::new(pipeline, Arc::new(MemoryJobStore::new())))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_service() {
        let root = tempfile::tempdir().unwrap();
        let app = router(test_state(root.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], "Framecast Video Service");
    }

    #[tokio::test]
    async fn test_unknown_job_returns_404() {
        let root = tempfile::tempdir().unwrap();
        let app = router(test_state(root.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/job-status/video-job-missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_generate_video_rejects_empty_sprint() {
        let root = tempfile::tempdir().unwrap();
        let app = router(test_state(root.path()));

        let body = json!({
            "sprintId": "",
            "dayNumber": 1,
            "videoScript": {
                "title": "Day 1",
                "segments": [
                    {"type": "opening", "startTime": 0.0, "endTime": 5.0}
                ],
                "totalDuration": 5.0
            }
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/generate-video")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_generate_video_returns_job_id() {
        let root = tempfile::tempdir().unwrap();
        let app = router(test_state(root.path()));

        let body = json!({
            "sprintId": "sprint-1",
            "dayNumber": 1,
            "videoScript": {
                "title": "Day 1",
                "segments": [
                    {"type": "opening", "startTime": 0.0, "endTime": 5.0}
                ],
                "totalDuration": 5.0
            }
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/generate-video")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["status"], "processing");
        assert!(
            json["jobId"]
                .as_str()
                .unwrap()
                .starts_with("video-job-sprint-1-1-")
        );
    }

    #[tokio::test]
    async fn test_sync_invalid_segment_timing_returns_bad_request() {
        let root = tempfile::tempdir().unwrap();
        let app = router(test_state(root.path()));

        // Zero-span segment: compiles to zero frames, a caller mistake
        let body = json!({
            "sprintId": "sprint-1",
            "dayNumber": 1,
            "videoScript": {
                "title": "Day 1",
                "segments": [
                    {"type": "opening", "startTime": 1.0, "endTime": 1.0}
                ],
                "totalDuration": 5.0
            },
            "sync": true
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/generate-video")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_generate_video_rejects_traversal_sprint_id() {
        let root = tempfile::tempdir().unwrap();
        let app = router(test_state(root.path()));

        let body = json!({
            "sprintId": "../outside",
            "dayNumber": 1,
            "videoScript": {
                "title": "Day 1",
                "segments": [
                    {"type": "opening", "startTime": 0.0, "endTime": 5.0}
                ],
                "totalDuration": 5.0
            }
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/generate-video")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_video_status_rejects_traversal_sprint_id() {
        let root = tempfile::tempdir().unwrap();
        let app = router(test_state(root.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/video-status/../3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_video_status_for_missing_artifact() {
        let root = tempfile::tempdir().unwrap();
        let app = router(test_state(root.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/video-status/sprint-1/3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["exists"], false);
    }
}
