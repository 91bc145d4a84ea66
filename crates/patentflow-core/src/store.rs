//! Job store: the externally persisted job record behind a trait.
//!
//! The relational engine itself is an external collaborator; the pipeline
//! only needs these operations. `MemoryJobStore` is the reference
//! implementation used by tests and single-process deployments.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::error::PipelineError;
use crate::types::{Job, JobStatus, Phase};

/// What a completed phase persists: the result value and the model that
/// produced it. Applied together with the status transition in one update.
#[derive(Debug, Clone)]
pub struct PhaseResult {
    pub phase: Phase,
    pub data: Value,
    pub model_used: String,
    /// Credits deducted for this phase (Write only; zero elsewhere).
    pub credits_charged: i64,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: Job) -> Result<(), PipelineError>;

    async fn get(&self, id: &str) -> Result<Option<Job>, PipelineError>;

    /// Persist a phase result and advance the job's status in one update.
    /// Prior result fields are preserved; the Write phase also stamps
    /// `completed_at`.
    async fn complete_phase(&self, id: &str, result: PhaseResult) -> Result<Job, PipelineError>;
}

// ── In-memory reference implementation ───────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<String, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, job: Job) -> Result<(), PipelineError> {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Job>, PipelineError> {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(jobs.get(id).cloned())
    }

    async fn complete_phase(&self, id: &str, result: PhaseResult) -> Result<Job, PipelineError> {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| PipelineError::JobNotFound(id.to_string()))?;

        let now = Utc::now();
        match result.phase {
            Phase::Analyze => {
                job.result_data.analysis = Some(result.data);
                job.status = JobStatus::AnalysisCompleted;
            }
            Phase::Think => {
                job.result_data.thinking = Some(result.data);
                job.status = JobStatus::ThinkingCompleted;
            }
            Phase::Write => {
                let draft = match result.data {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                job.result_data.draft = Some(draft);
                job.status = JobStatus::Completed;
                job.completed_at = Some(now);
            }
        }
        job.result_data.model_used = Some(result.model_used);
        job.credits_charged += result.credits_charged;
        job.updated_at = now;

        Ok(job.clone())
    }
}
