use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::error;

use patentflow_core::error::PipelineError;
use patentflow_core::pipeline::{PhaseRequest, Pipeline};
use patentflow_core::store::JobStore;
use patentflow_core::types::{Job, Phase, PhaseReport};

// ── AppState ──────────────────────────────────────────────────────────────

/// Hosting-boundary deadlines, one per phase (Analyze shortest, Write
/// longest). Expiry leaves the job untouched: nothing is persisted until a
/// phase fully succeeds.
#[derive(Debug, Clone, Copy)]
pub struct PhaseTimeouts {
    pub analyze: Duration,
    pub think: Duration,
    pub write: Duration,
}

pub struct AppState {
    pub pipeline: Pipeline,
    pub store: Arc<dyn JobStore>,
    pub timeouts: PhaseTimeouts,
}

// ── Request body types ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CreateJobBody {
    account: String,
    #[serde(default)]
    input_data: Value,
}

#[derive(Deserialize)]
struct PhaseBody {
    #[serde(default)]
    inputs: Value,
    model_name: Option<String>,
    #[serde(default)]
    enable_search: bool,
}

impl PhaseBody {
    fn into_request(self, job_id: String) -> PhaseRequest {
        PhaseRequest {
            job_id,
            inputs: self.inputs,
            model_name: self.model_name,
            enable_search: self.enable_search,
        }
    }
}

// ── Response envelopes ────────────────────────────────────────────────────

fn success(report: PhaseReport) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": report.data,
        "credits_required": report.credits_required,
        "credits_deducted": report.credits_deducted,
        "remaining_credits": report.remaining_credits,
        "message": report.message,
    }))
}

fn failure(e: &PipelineError) -> (StatusCode, Json<Value>) {
    let status = match e {
        PipelineError::Validation { .. } | PipelineError::UnknownModel(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PipelineError::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
        PipelineError::MissingPriorPhase { .. } => StatusCode::CONFLICT,
        PipelineError::JobNotFound(_) => StatusCode::NOT_FOUND,
        PipelineError::Provider { .. }
        | PipelineError::ResponseShape { .. }
        | PipelineError::MalformedOutput { .. }
        | PipelineError::Http(_) => StatusCode::BAD_GATEWAY,
        PipelineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        PipelineError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let details = match e {
        PipelineError::Provider { body, .. } => Some(body.clone()),
        PipelineError::MalformedOutput { head, .. } => Some(head.clone()),
        PipelineError::Validation { missing } => Some(missing.join(", ")),
        _ => None,
    };

    error!(status = %status, "phase failed: {e}");
    (
        status,
        Json(json!({
            "success": false,
            "error": e.to_string(),
            "details": details,
        })),
    )
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateJobBody>,
) -> Result<Json<Job>, (StatusCode, Json<Value>)> {
    let job = Job::new(body.account, body.input_data);
    state
        .store
        .insert(job.clone())
        .await
        .map_err(|e| failure(&e))?;
    Ok(Json(job))
}

async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Job>, (StatusCode, Json<Value>)> {
    match state.store.get(&id).await {
        Ok(Some(job)) => Ok(Json(job)),
        Ok(None) => Err(failure(&PipelineError::JobNotFound(id))),
        Err(e) => Err(failure(&e)),
    }
}

async fn run_phase(
    state: &AppState,
    phase: Phase,
    req: PhaseRequest,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let deadline = match phase {
        Phase::Analyze => state.timeouts.analyze,
        Phase::Think => state.timeouts.think,
        Phase::Write => state.timeouts.write,
    };
    let outcome = match phase {
        Phase::Analyze => tokio::time::timeout(deadline, state.pipeline.analyze(req)).await,
        Phase::Think => tokio::time::timeout(deadline, state.pipeline.think(req)).await,
        Phase::Write => tokio::time::timeout(deadline, state.pipeline.write(req)).await,
    };

    match outcome {
        Ok(Ok(report)) => Ok(success(report)),
        Ok(Err(e)) => Err(failure(&e)),
        Err(_) => Err(failure(&PipelineError::Timeout {
            phase: phase.name(),
            seconds: deadline.as_secs(),
        })),
    }
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<PhaseBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    run_phase(&state, Phase::Analyze, body.into_request(id)).await
}

async fn think(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<PhaseBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    run_phase(&state, Phase::Think, body.into_request(id)).await
}

async fn write(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<PhaseBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    run_phase(&state, Phase::Write, body.into_request(id)).await
}

// ── Router ────────────────────────────────────────────────────────────────

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/jobs", post(create_job))
        .route("/api/jobs/:id", get(get_job))
        .route("/api/jobs/:id/analyze", post(analyze))
        .route("/api/jobs/:id/think", post(think))
        .route("/api/jobs/:id/write", post(write))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
