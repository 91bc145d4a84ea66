// End-to-end pipeline tests over mock providers and the in-memory stores:
// phase ordering, credit gating, prior-phase requirements, and the
// degrade-on-search-failure policy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use patentflow_core::error::PipelineError;
use patentflow_core::ledger::{CreditLedger, MemoryLedger};
use patentflow_core::pipeline::{Pipeline, PhaseRequest, ProviderSet};
use patentflow_core::provider::{InvokeRequest, ProviderClient};
use patentflow_core::registry::ModelRegistry;
use patentflow_core::search::{PriorArtAdapter, RawSearchResult, SearchBackend};
use patentflow_core::store::{JobStore, MemoryJobStore};
use patentflow_core::types::{Job, JobStatus, Phase, PhasePlan, PhaseSpec};

// ── Mocks ────────────────────────────────────────────────────────────────

/// Provider mock that returns a fixed body and counts invocations.
struct ScriptedProvider {
    body: String,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(body: &str) -> Arc<Self> {
        Arc::new(Self {
            body: body.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    async fn invoke(&self, _req: InvokeRequest<'_>) -> Result<String, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.body.clone())
    }
}

struct FailingProvider;

#[async_trait]
impl ProviderClient for FailingProvider {
    async fn invoke(&self, _req: InvokeRequest<'_>) -> Result<String, PipelineError> {
        Err(PipelineError::provider("anthropic", 529, "overloaded"))
    }
}

struct FailingSearch;

#[async_trait]
impl SearchBackend for FailingSearch {
    async fn search(
        &self,
        _query: &str,
        _max: usize,
    ) -> Result<Vec<RawSearchResult>, PipelineError> {
        Err(PipelineError::provider("search", 500, "backend down"))
    }
}

// ── Fixture ──────────────────────────────────────────────────────────────

fn test_plan() -> PhasePlan {
    PhasePlan {
        analyze: PhaseSpec {
            phase: Phase::Analyze,
            prompt: "Analyze {{title}} in {{field}}. Prior art: {{prior_art}}",
            temperature: 0.2,
            streaming: false,
            required_inputs: &["title", "field", "solution"],
        },
        think: PhaseSpec {
            phase: Phase::Think,
            prompt: "Plan from analysis: {{analysis_json}}",
            temperature: 0.2,
            streaming: true,
            required_inputs: &[],
        },
        write: PhaseSpec {
            phase: Phase::Write,
            prompt: "Write {{title}} using {{thinking_json.outline}}",
            temperature: 0.3,
            streaming: true,
            required_inputs: &[],
        },
    }
}

struct Fixture {
    pipeline: Pipeline,
    store: Arc<MemoryJobStore>,
    ledger: Arc<MemoryLedger>,
    provider: Arc<ScriptedProvider>,
    job_id: String,
}

async fn fixture_with(provider: Arc<ScriptedProvider>, balance: i64) -> Fixture {
    let store = Arc::new(MemoryJobStore::new());
    let ledger = Arc::new(MemoryLedger::new());
    ledger.credit("u1", balance);

    let job = Job::new(
        "u1",
        json!({"title": "X", "field": "Y", "solution": "Z"}),
    );
    let job_id = job.id.clone();
    store.insert(job).await.unwrap();

    let providers = ProviderSet {
        anthropic: provider.clone(),
        openai: provider.clone(),
        gemini: provider.clone(),
    };

    let pipeline = Pipeline::new(
        store.clone(),
        ledger.clone(),
        providers,
        ModelRegistry::builtin(),
        test_plan(),
    );

    Fixture {
        pipeline,
        store,
        ledger,
        provider,
        job_id,
    }
}

fn analyze_req(job_id: &str) -> PhaseRequest {
    PhaseRequest {
        job_id: job_id.to_string(),
        inputs: json!({"title": "X", "field": "Y", "solution": "Z"}),
        model_name: Some("claude-haiku-4.5".into()),
        enable_search: false,
    }
}

fn phase_req(job_id: &str) -> PhaseRequest {
    PhaseRequest {
        job_id: job_id.to_string(),
        inputs: json!({}),
        model_name: Some("claude-haiku-4.5".into()),
        enable_search: false,
    }
}

// ── Scenario A: analyze happy path ───────────────────────────────────────

#[tokio::test]
async fn test_analyze_success_persists_and_advances() {
    let f = fixture_with(ScriptedProvider::new(r#"{"quality":"L2"}"#), 1000).await;

    let report = f.pipeline.analyze(analyze_req(&f.job_id)).await.unwrap();
    assert_eq!(report.credits_required, Some(50));
    assert_eq!(report.data, json!({"quality": "L2"}));

    let job = f.store.get(&f.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::AnalysisCompleted);
    assert_eq!(job.result_data.analysis, Some(json!({"quality": "L2"})));
    assert_eq!(job.result_data.model_used.as_deref(), Some("claude-haiku-4.5"));
    // Analyze never deducts.
    assert_eq!(f.ledger.balance("u1").await.unwrap(), 1000);
}

#[tokio::test]
async fn test_analyze_missing_field_fails_without_provider_call() {
    let f = fixture_with(ScriptedProvider::new("{}"), 1000).await;

    let req = PhaseRequest {
        inputs: json!({"title": "X"}),
        ..analyze_req(&f.job_id)
    };
    let err = f.pipeline.analyze(req).await;
    assert!(matches!(err, Err(PipelineError::Validation { .. })));
    assert_eq!(f.provider.call_count(), 0);

    let job = f.store.get(&f.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert!(job.result_data.analysis.is_none());
}

#[tokio::test]
async fn test_analyze_insufficient_balance_blocks_call() {
    let f = fixture_with(ScriptedProvider::new("{}"), 10).await;

    let err = f.pipeline.analyze(analyze_req(&f.job_id)).await;
    match err {
        Err(PipelineError::InsufficientCredits { required, available }) => {
            assert_eq!(required, 50);
            assert_eq!(available, 10);
        }
        other => panic!("expected InsufficientCredits, got {other:?}"),
    }
    assert_eq!(f.provider.call_count(), 0);
}

#[tokio::test]
async fn test_analyze_unknown_model() {
    let f = fixture_with(ScriptedProvider::new("{}"), 1000).await;
    let req = PhaseRequest {
        model_name: Some("not-a-model".into()),
        ..analyze_req(&f.job_id)
    };
    assert!(matches!(
        f.pipeline.analyze(req).await,
        Err(PipelineError::UnknownModel(_))
    ));
}

#[tokio::test]
async fn test_analyze_search_failure_degrades() {
    let store = Arc::new(MemoryJobStore::new());
    let ledger = Arc::new(MemoryLedger::new());
    ledger.credit("u1", 1000);
    let job = Job::new("u1", json!({"title": "X", "field": "Y", "solution": "Z"}));
    let job_id = job.id.clone();
    store.insert(job).await.unwrap();

    let provider = ScriptedProvider::new(r#"{"ok":true}"#);
    let pipeline = Pipeline::new(
        store.clone(),
        ledger.clone(),
        ProviderSet {
            anthropic: provider.clone(),
            openai: provider.clone(),
            gemini: provider.clone(),
        },
        ModelRegistry::builtin(),
        test_plan(),
    )
    .with_prior_art(PriorArtAdapter::new(Arc::new(FailingSearch), 5), 20);

    let req = PhaseRequest {
        enable_search: true,
        ..analyze_req(&job_id)
    };
    let report = pipeline.analyze(req).await.unwrap();

    // Search failed: the phase still completes and the search fee is waived.
    assert_eq!(report.credits_required, Some(50));
    let job = store.get(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::AnalysisCompleted);
}

// ── Scenario E: think requires analysis ──────────────────────────────────

#[tokio::test]
async fn test_think_without_analysis_fails() {
    let f = fixture_with(ScriptedProvider::new("{}"), 1000).await;

    let err = f.pipeline.think(phase_req(&f.job_id)).await;
    match err {
        Err(PipelineError::MissingPriorPhase { phase, missing }) => {
            assert_eq!(phase, "think");
            assert_eq!(missing, "analysis");
        }
        other => panic!("expected MissingPriorPhase, got {other:?}"),
    }
    assert_eq!(f.provider.call_count(), 0);

    let job = f.store.get(&f.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Queued);
}

#[tokio::test]
async fn test_think_success_is_free() {
    let f = fixture_with(ScriptedProvider::new(r#"{"outline":"..."}"#), 1000).await;

    f.pipeline.analyze(analyze_req(&f.job_id)).await.unwrap();
    let report = f.pipeline.think(phase_req(&f.job_id)).await.unwrap();

    assert_eq!(report.credits_deducted, None);
    assert_eq!(f.ledger.balance("u1").await.unwrap(), 1000);

    let job = f.store.get(&f.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::ThinkingCompleted);
    assert!(job.result_data.analysis.is_some());
    assert!(job.result_data.thinking.is_some());
}

// ── Scenario D: write credit gating ──────────────────────────────────────

#[tokio::test]
async fn test_write_insufficient_credits_blocks_provider_call() {
    let f = fixture_with(ScriptedProvider::new(r#"{"any":1}"#), 1000).await;
    f.pipeline.analyze(analyze_req(&f.job_id)).await.unwrap();
    f.pipeline.think(phase_req(&f.job_id)).await.unwrap();

    // Drain the account down to 40; write costs 50.
    let drained = 1000 - 40;
    f.ledger
        .deduct(patentflow_core::ledger::DeductRequest {
            account: "u1".into(),
            amount: drained,
            reason: "test drain".into(),
            job_reference: "setup".into(),
            idempotency_key: "drain".into(),
        })
        .await
        .unwrap();

    let calls_before = f.provider.call_count();
    let err = f.pipeline.write(phase_req(&f.job_id)).await;
    match err {
        Err(PipelineError::InsufficientCredits { required, available }) => {
            assert_eq!(required, 50);
            assert_eq!(available, 40);
        }
        other => panic!("expected InsufficientCredits, got {other:?}"),
    }
    // The gateway must never be reached on a failed pre-check.
    assert_eq!(f.provider.call_count(), calls_before);

    let job = f.store.get(&f.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::ThinkingCompleted);
    assert!(job.result_data.draft.is_none());
    assert_eq!(f.ledger.balance("u1").await.unwrap(), 40);
}

#[tokio::test]
async fn test_write_without_thinking_fails() {
    let f = fixture_with(ScriptedProvider::new(r#"{"a":1}"#), 1000).await;
    f.pipeline.analyze(analyze_req(&f.job_id)).await.unwrap();

    let err = f.pipeline.write(phase_req(&f.job_id)).await;
    match err {
        Err(PipelineError::MissingPriorPhase { phase, missing }) => {
            assert_eq!(phase, "write");
            assert_eq!(missing, "thinking");
        }
        other => panic!("expected MissingPriorPhase, got {other:?}"),
    }
    // No deduction happened for the rejected phase.
    assert_eq!(f.ledger.balance("u1").await.unwrap(), 1000);
}

#[tokio::test]
async fn test_write_deducts_and_completes() {
    let f = fixture_with(ScriptedProvider::new("# Draft\n\nClaims..."), 1000).await;
    f.pipeline.analyze(analyze_req(&f.job_id)).await.unwrap();
    f.pipeline.think(phase_req(&f.job_id)).await.unwrap();

    let report = f.pipeline.write(phase_req(&f.job_id)).await.unwrap();
    assert_eq!(report.credits_deducted, Some(50));
    assert_eq!(report.remaining_credits, Some(950));

    let job = f.store.get(&f.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.completed_at.is_some());
    assert_eq!(job.credits_charged, 50);
    assert_eq!(job.result_data.draft.as_deref(), Some("# Draft\n\nClaims..."));
    // The draft is prose: it is not JSON-parsed.
    assert_eq!(f.ledger.entries("u1").len(), 1);
}

#[tokio::test]
async fn test_write_provider_failure_keeps_deduction_but_not_status() {
    let store = Arc::new(MemoryJobStore::new());
    let ledger = Arc::new(MemoryLedger::new());
    ledger.credit("u1", 1000);
    let job = Job::new("u1", json!({"title": "X", "field": "Y", "solution": "Z"}));
    let job_id = job.id.clone();
    store.insert(job).await.unwrap();

    let good = ScriptedProvider::new(r#"{"ok":1}"#);
    let pipeline = Pipeline::new(
        store.clone(),
        ledger.clone(),
        ProviderSet {
            anthropic: good.clone(),
            openai: good.clone(),
            gemini: good.clone(),
        },
        ModelRegistry::builtin(),
        test_plan(),
    );
    pipeline.analyze(analyze_req(&job_id)).await.unwrap();
    pipeline.think(phase_req(&job_id)).await.unwrap();

    // Swap in a failing provider for the write call.
    let failing = Pipeline::new(
        store.clone(),
        ledger.clone(),
        ProviderSet {
            anthropic: Arc::new(FailingProvider),
            openai: Arc::new(FailingProvider),
            gemini: Arc::new(FailingProvider),
        },
        ModelRegistry::builtin(),
        test_plan(),
    );

    let err = failing.write(phase_req(&job_id)).await;
    assert!(matches!(err, Err(PipelineError::Provider { status: 529, .. })));

    // Deduct-first ordering: the spend stands, the job does not advance.
    assert_eq!(ledger.balance("u1").await.unwrap(), 950);
    let job = store.get(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::ThinkingCompleted);
    assert!(job.result_data.draft.is_none());

    // A retry replays the idempotency key and is not charged again.
    let retry = failing.write(phase_req(&job_id)).await;
    assert!(retry.is_err());
    assert_eq!(ledger.balance("u1").await.unwrap(), 950);
}

#[tokio::test]
async fn test_malformed_model_output_fails_analyze() {
    let f = fixture_with(ScriptedProvider::new("I refuse to answer in JSON."), 1000).await;

    let err = f.pipeline.analyze(analyze_req(&f.job_id)).await;
    assert!(matches!(err, Err(PipelineError::MalformedOutput { .. })));

    let job = f.store.get(&f.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Queued);
}

#[tokio::test]
async fn test_unknown_job() {
    let f = fixture_with(ScriptedProvider::new("{}"), 1000).await;
    let err = f.pipeline.analyze(analyze_req("no-such-job")).await;
    assert!(matches!(err, Err(PipelineError::JobNotFound(_))));
}
