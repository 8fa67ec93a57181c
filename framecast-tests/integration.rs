//! Integration tests for Framecast
//!
//! These tests verify the interaction between the asset pipeline, the job
//! registry, the bulk orchestrator, and the storage backends, using the
//! simulation renderer and in-memory object store.

#[path = "integration/pipeline_workflow.rs"]
mod pipeline_workflow;

#[path = "integration/job_lifecycle.rs"]
mod job_lifecycle;

#[path = "integration/bulk_isolation.rs"]
mod bulk_isolation;
