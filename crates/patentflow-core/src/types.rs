use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Job state machine ────────────────────────────────────────────────────

/// Status of a drafting job as it moves through the phase state machine.
///
/// Forward transitions are performed by the pipeline only:
/// `Queued → Analyzing → AnalysisCompleted → ThinkingCompleted → Completed`.
/// `Failed` is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Analyzing,
    AnalysisCompleted,
    ThinkingCompleted,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Per-phase results accumulated on a job. Fields are only ever added on
/// successful phase completion, never removed or overwritten with partials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
}

/// A drafting job as stored in the job store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    /// Credit account charged for paid phases.
    pub account: String,
    pub status: JobStatus,
    /// User-supplied invention disclosure fields (title, field, solution, ...).
    pub input_data: Value,
    pub result_data: ResultData,
    /// Total credits deducted for this job so far.
    pub credits_charged: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(account: impl Into<String>, input_data: Value) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            account: account.into(),
            status: JobStatus::Queued,
            input_data,
            result_data: ResultData::default(),
            credits_charged: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}

// ── Phase definitions ────────────────────────────────────────────────────

/// The three pipeline phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Analyze,
    Think,
    Write,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Think => "think",
            Self::Write => "write",
        }
    }
}

/// Static definition of one phase: prompt template, sampling temperature,
/// transport mode, and the input fields that must be present before the
/// phase may run.
#[derive(Debug, Clone)]
pub struct PhaseSpec {
    pub phase: Phase,
    pub prompt: &'static str,
    pub temperature: f32,
    pub streaming: bool,
    pub required_inputs: &'static [&'static str],
}

/// The full three-phase plan, injected into the pipeline at construction.
#[derive(Debug, Clone)]
pub struct PhasePlan {
    pub analyze: PhaseSpec,
    pub think: PhaseSpec,
    pub write: PhaseSpec,
}

impl PhasePlan {
    pub fn spec(&self, phase: Phase) -> &PhaseSpec {
        match phase {
            Phase::Analyze => &self.analyze,
            Phase::Think => &self.think,
            Phase::Write => &self.write,
        }
    }
}

// ── Phase invocation results ─────────────────────────────────────────────

/// Successful outcome of one phase invocation, returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    pub phase: Phase,
    /// Parsed JSON for Analyze/Think; raw prose string for Write.
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits_required: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits_deducted: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_credits: Option<i64>,
    pub message: String,
}

// ── Prior-art search ─────────────────────────────────────────────────────

/// One normalized prior-art search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patent_number: Option<String>,
    /// Which database the hit came from ("Google Patents", "TIPO", "Unknown").
    pub source: String,
}

/// Outcome of a prior-art retrieval attempt. Degraded retrieval is an
/// ordinary value, not an error: callers must handle both variants.
#[derive(Debug, Clone)]
pub enum PriorArt {
    Results(Vec<SearchResult>),
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_starts_queued() {
        let job = Job::new("acct-1", serde_json::json!({"title": "X"}));
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.result_data.analysis.is_none());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::ThinkingCompleted.is_terminal());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let s = serde_json::to_string(&JobStatus::AnalysisCompleted).unwrap();
        assert_eq!(s, "\"analysis_completed\"");
    }

    #[test]
    fn test_result_data_skips_absent_fields() {
        let rd = ResultData {
            analysis: Some(serde_json::json!({"a": 1})),
            ..Default::default()
        };
        let v = serde_json::to_value(&rd).unwrap();
        assert!(v.get("analysis").is_some());
        assert!(v.get("thinking").is_none());
        assert!(v.get("draft").is_none());
    }
}
