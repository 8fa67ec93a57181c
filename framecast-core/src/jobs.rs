//! Job registry and render-job state machine.
//!
//! Jobs move `Queued -> Processing -> {Completed, Failed}`. A job's state
//! is mutated only by the task executing its pipeline run; everyone else
//! reads snapshots through the store. The store itself is an injected
//! key-value abstraction so a durable backend can replace the volatile
//! in-memory map without touching pipeline logic.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};

use crate::pipeline::{
    ArtifactInfo, AssetPipeline, CancelHandle, CancelToken, RenderRequest,
};

/// Lifecycle state of a render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Snapshot of one asynchronous render job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderJob {
    #[serde(rename = "jobId")]
    pub id: String,
    pub status: JobStatus,
    /// Coarse progress in percent, forced to 100 on completion
    pub progress: u8,
    #[serde(rename = "sprintId")]
    pub sprint_id: String,
    #[serde(rename = "dayNumber")]
    pub day_number: u32,
    #[serde(rename = "startTime")]
    pub started_at: DateTime<Utc>,
    /// Job duration estimate surfaced to polling clients, in seconds
    #[serde(rename = "estimatedTime")]
    pub estimated_seconds: u64,
    #[serde(rename = "completedAt", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ArtifactInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Errors from job store operations.
#[derive(Debug, thiserror::Error)]
pub enum JobStoreError {
    #[error("Job {job_id} not found")]
    NotFound { job_id: String },

    #[error("Job store backend error: {reason}")]
    Backend { reason: String },
}

/// Key-value storage for job state.
///
/// The reference backend is volatile process memory; implementations with
/// durable backends can be substituted without changing the registry.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts or replaces a job snapshot.
    async fn put(&self, job: RenderJob) -> Result<(), JobStoreError>;

    /// Fetches a consistent snapshot of a job, if present.
    async fn get(&self, job_id: &str) -> Result<Option<RenderJob>, JobStoreError>;

    /// Removes a job.
    async fn remove(&self, job_id: &str) -> Result<(), JobStoreError>;

    /// All job snapshots, in no particular order.
    async fn list(&self) -> Result<Vec<RenderJob>, JobStoreError>;
}

/// In-memory job store. State does not survive process restart.
#[derive(Clone, Default)]
pub struct MemoryJobStore {
    jobs: Arc<RwLock<HashMap<String, RenderJob>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn put(&self, job: RenderJob) -> Result<(), JobStoreError> {
        self.jobs.write().await.insert(job.id.clone(), job);
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<RenderJob>, JobStoreError> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn remove(&self, job_id: &str) -> Result<(), JobStoreError> {
        self.jobs.write().await.remove(job_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RenderJob>, JobStoreError> {
        Ok(self.jobs.read().await.values().cloned().collect())
    }
}

/// Registry that creates, runs, and tracks render jobs.
///
/// `run_job` spawns the pipeline onto the runtime and returns immediately;
/// callers poll job snapshots for progress and terminal state.
#[derive(Clone)]
pub struct JobRegistry {
    pipeline: AssetPipeline,
    store: Arc<dyn JobStore>,
    // Requests awaiting run_job, and cancel handles for in-flight jobs
    queued: Arc<RwLock<HashMap<String, RenderRequest>>>,
    cancels: Arc<RwLock<HashMap<String, CancelHandle>>>,
}

impl JobRegistry {
    pub fn new(pipeline: AssetPipeline, store: Arc<dyn JobStore>) -> Self {
        Self {
            pipeline,
            store,
            queued: Arc::new(RwLock::new(HashMap::new())),
            cancels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn pipeline(&self) -> &AssetPipeline {
        &self.pipeline
    }

    /// Creates a new job in `Queued` state and returns its id.
    ///
    /// # Errors
    /// - `FramecastError::Pipeline(PipelineError::InvalidRequest)` -
    ///   Missing identity fields or empty script
    pub async fn create_job(&self, request: RenderRequest) -> crate::Result<String> {
        request.validate().map_err(crate::FramecastError::Pipeline)?;

        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let job_id = format!(
            "video-job-{}-{}-{}",
            request.sprint_id,
            request.day_number,
            &suffix[..8]
        );

        let job = RenderJob {
            id: job_id.clone(),
            status: JobStatus::Queued,
            progress: 0,
            sprint_id: request.sprint_id.clone(),
            day_number: request.day_number,
            started_at: Utc::now(),
            estimated_seconds: self.pipeline.config().pipeline.estimated_seconds,
            completed_at: None,
            result: None,
            error: None,
        };

        self.store.put(job).await?;
        self.queued.write().await.insert(job_id.clone(), request);

        tracing::info!("Created render job {}", job_id);
        Ok(job_id)
    }

    /// Returns a snapshot of a job.
    ///
    /// # Errors
    /// - `FramecastError::JobStore(JobStoreError::NotFound)` - Unknown id
    pub async fn job(&self, job_id: &str) -> crate::Result<RenderJob> {
        match self.store.get(job_id).await? {
            Some(job) => Ok(job),
            None => Err(crate::FramecastError::JobStore(JobStoreError::NotFound {
                job_id: job_id.to_string(),
            })),
        }
    }

    /// Begins executing a queued job without blocking the caller.
    ///
    /// The spawned task owns all writes to the job's state from here on.
    ///
    /// # Errors
    /// - `FramecastError::JobStore(JobStoreError::NotFound)` - Unknown id
    ///   or job already started
    pub async fn run_job(&self, job_id: &str) -> crate::Result<()> {
        let request = self.queued.write().await.remove(job_id).ok_or_else(|| {
            crate::FramecastError::JobStore(JobStoreError::NotFound {
                job_id: job_id.to_string(),
            })
        })?;

        let (handle, token) = CancelToken::new();
        self.cancels
            .write()
            .await
            .insert(job_id.to_string(), handle);

        let registry = self.clone();
        let job_id = job_id.to_string();
        tokio::spawn(async move {
            registry.execute_job(job_id, request, token).await;
        });

        Ok(())
    }

    /// Convenience for the fire-and-continue request path: create a job
    /// and immediately begin executing it.
    pub async fn start_job(&self, request: RenderRequest) -> crate::Result<String> {
        let job_id = self.create_job(request).await?;
        self.run_job(&job_id).await?;
        Ok(job_id)
    }

    /// Requests cooperative cancellation of an in-flight job.
    ///
    /// Returns false if the job is unknown or already finished.
    pub async fn cancel_job(&self, job_id: &str) -> bool {
        match self.cancels.read().await.get(job_id) {
            Some(handle) => {
                handle.cancel();
                tracing::info!("Cancellation requested for job {}", job_id);
                true
            }
            None => false,
        }
    }

    async fn execute_job(&self, job_id: String, request: RenderRequest, token: CancelToken) {
        tracing::info!("Processing job {}", job_id);

        // Nominal starting progress signals liveness before the first
        // real milestone
        self.transition(&job_id, |job| {
            job.status = JobStatus::Processing;
            job.progress = 10;
        })
        .await;

        let (tx, mut progress_rx) = mpsc::unbounded_channel();
        let run = self.pipeline.render_video(&request, Some(tx), &token);
        tokio::pin!(run);

        // Single writer loop: progress updates and the terminal result
        // are applied by this task alone, serializing writes per job id
        let outcome = loop {
            tokio::select! {
                Some(percent) = progress_rx.recv() => {
                    self.transition(&job_id, |job| job.progress = percent).await;
                }
                result = &mut run => break result,
            }
        };

        match outcome {
            Ok(artifact) => {
                tracing::info!("Job {} complete: {}", job_id, artifact.url);
                self.transition(&job_id, |job| {
                    job.status = JobStatus::Completed;
                    job.progress = 100;
                    job.completed_at = Some(Utc::now());
                    job.result = Some(artifact);
                })
                .await;
            }
            Err(e) => {
                tracing::error!("Job {} failed: {}", job_id, e);
                let message = e.to_string();
                self.transition(&job_id, |job| {
                    job.status = JobStatus::Failed;
                    job.completed_at = Some(Utc::now());
                    job.error = Some(message);
                })
                .await;
            }
        }

        self.cancels.write().await.remove(&job_id);
    }

    async fn transition(&self, job_id: &str, apply: impl FnOnce(&mut RenderJob)) {
        match self.store.get(job_id).await {
            Ok(Some(mut job)) => {
                apply(&mut job);
                if let Err(e) = self.store.put(job).await {
                    tracing::error!("Failed to persist job {} update: {}", job_id, e);
                }
            }
            Ok(None) => {
                tracing::warn!("Job {} vanished from store mid-run", job_id);
            }
            Err(e) => {
                tracing::error!("Failed to load job {} for update: {}", job_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::tempdir;

    use super::*;
    use crate::config::FramecastConfig;
    use crate::render::NullRenderer;
    use crate::script::{BrandColors, Script, Segment, SegmentKind};
    use crate::storage::MemoryObjectStore;

    fn request() -> RenderRequest {
        RenderRequest {
            sprint_id: "sprint-7".to_string(),
            day_number: 2,
            script: Script {
                title: "Day 2".to_string(),
                subtitle: None,
                segments: vec![Segment {
                    kind: SegmentKind::Opening,
                    start_time: 0.0,
                    end_time: 4.0,
                    content: serde_json::Value::Null,
                }],
                total_duration: 4.0,
                audio_file: None,
            },
            brand_colors: BrandColors::default(),
        }
    }

    fn registry(renderer: NullRenderer, workspace_root: &std::path::Path) -> JobRegistry {
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
        for _ in 0..100 {
            let job = registry.job(job_id).await.unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {job_id} never reached a terminal state");
    }

    #[tokio::test]
    async fn test_created_job_is_queued() {
        let root = tempdir().unwrap();
        let registry = registry(NullRenderer::new(), root.path());

        let job_id = registry.create_job(request()).await.unwrap();
        let job = registry.job(&job_id).await.unwrap();

        assert!(job_id.starts_with("video-job-sprint-7-2-"));
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert_eq!(job.sprint_id, "sprint-7");
        assert_eq!(job.day_number, 2);
        assert!(job.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_job_completes_with_artifact() {
        let root = tempdir().unwrap();
        let registry = registry(NullRenderer::new(), root.path());

        let job_id = registry.start_job(request()).await.unwrap();
        let job = wait_terminal(&registry, &job_id).await;

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.completed_at.is_some());
        let artifact = job.result.unwrap();
        assert!(!artifact.url.is_empty());
        assert_eq!(artifact.file_name, "sprint-7/day-2.mp4");
        assert!(job.error.is_none());
    }

    #[tokio::test]
    async fn test_failed_job_retains_error_message() {
        let root = tempdir().unwrap();
        let registry = registry(NullRenderer::new().failing(), root.path());

        let job_id = registry.start_job(request()).await.unwrap();
        let job = wait_terminal(&registry, &job_id).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.completed_at.is_some());
        assert!(job.result.is_none());
        let error = job.error.unwrap();
        assert!(error.contains("simulated render failure"), "got: {error}");
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let root = tempdir().unwrap();
        let registry = registry(NullRenderer::new(), root.path());

        let result = registry.job("video-job-missing").await;
        assert!(matches!(
            result,
            Err(crate::FramecastError::JobStore(JobStoreError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_run_job_twice_fails_second_time() {
        let root = tempdir().unwrap();
        let registry = registry(NullRenderer::new(), root.path());

        let job_id = registry.create_job(request()).await.unwrap();
        registry.run_job(&job_id).await.unwrap();
        assert!(registry.run_job(&job_id).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_request_rejected_at_creation() {
        let root = tempdir().unwrap();
        let registry = registry(NullRenderer::new(), root.path());

        let mut bad = request();
        bad.sprint_id.clear();
        let result = registry.create_job(bad).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cancelled_job_fails_with_cancelled_error() {
        let root = tempdir().unwrap();
        // Slow renderer leaves a window to cancel mid-flight
        let registry = registry(
            NullRenderer::new().with_delay(Duration::from_millis(300)),
            root.path(),
        );

        let job_id = registry.start_job(request()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(registry.cancel_job(&job_id).await);

        let job = wait_terminal(&registry, &job_id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.unwrap().contains("cancelled"));
    }

    #[tokio::test]
    async fn test_cancel_unknown_job_returns_false() {
        let root = tempdir().unwrap();
        let registry = registry(NullRenderer::new(), root.path());
        assert!(!registry.cancel_job("video-job-missing").await);
    }
}
