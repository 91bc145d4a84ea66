//! The phase state machine: Analyze → Think → Write.
//!
//! The pipeline owns every job state transition. Each phase validates its
//! preconditions, builds a prompt from the phase template plus prior-phase
//! output, invokes the provider gateway, and persists exactly one result on
//! success. Any error leaves the job at its last completed phase with no
//! partial result written.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::ledger::{CreditLedger, DeductRequest};
use crate::provider::{InvokeRequest, ProviderClient};
use crate::registry::{ModelConfig, ModelRegistry, Provider};
use crate::repair;
use crate::search::{format_prior_art, PriorArtAdapter};
use crate::store::{JobStore, PhaseResult};
use crate::template;
use crate::types::{Job, Phase, PhasePlan, PhaseReport, PhaseSpec, PriorArt};

/// One client per vendor, complete by construction.
#[derive(Clone)]
pub struct ProviderSet {
    pub anthropic: Arc<dyn ProviderClient>,
    pub openai: Arc<dyn ProviderClient>,
    pub gemini: Arc<dyn ProviderClient>,
}

impl ProviderSet {
    fn client(&self, provider: Provider) -> &Arc<dyn ProviderClient> {
        match provider {
            Provider::Anthropic => &self.anthropic,
            Provider::OpenAi => &self.openai,
            Provider::Gemini => &self.gemini,
        }
    }
}

/// Input to a phase invocation, per the external phase contract.
#[derive(Debug, Clone)]
pub struct PhaseRequest {
    pub job_id: String,
    /// Invention disclosure fields. An empty object falls back to the
    /// inputs stored on the job at creation.
    pub inputs: Value,
    pub model_name: Option<String>,
    /// Analyze only: enrich the prompt with prior-art search results.
    pub enable_search: bool,
}

pub struct Pipeline {
    store: Arc<dyn JobStore>,
    ledger: Arc<dyn CreditLedger>,
    providers: ProviderSet,
    registry: ModelRegistry,
    plan: PhasePlan,
    prior_art: Option<PriorArtAdapter>,
    search_cost: i64,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn JobStore>,
        ledger: Arc<dyn CreditLedger>,
        providers: ProviderSet,
        registry: ModelRegistry,
        plan: PhasePlan,
    ) -> Self {
        Self {
            store,
            ledger,
            providers,
            registry,
            plan,
            prior_art: None,
            search_cost: 0,
        }
    }

    /// Enable prior-art enrichment with its per-retrieval credit cost.
    pub fn with_prior_art(mut self, adapter: PriorArtAdapter, search_cost: i64) -> Self {
        self.prior_art = Some(adapter);
        self.search_cost = search_cost;
        self
    }

    // ── Phases ───────────────────────────────────────────────────────────

    /// Analyze: validate inputs, optionally enrich with prior art, check the
    /// balance (read-only — nothing is deducted here), invoke the model
    /// without streaming, repair-parse, persist `analysis`.
    pub async fn analyze(&self, req: PhaseRequest) -> Result<PhaseReport, PipelineError> {
        let job = self.load_job(&req.job_id).await?;
        let spec = &self.plan.analyze;
        let inputs = effective_inputs(&req, &job);

        let missing = missing_fields(&inputs, spec.required_inputs);
        if !missing.is_empty() {
            return Err(PipelineError::validation(missing));
        }

        let model = self.resolve_model(req.model_name.as_deref())?;
        let mut required_credits = model.cost_per_request;
        let balance = self.ledger.balance(&job.account).await?;

        let mut prior_art_text = "none".to_string();
        if req.enable_search {
            if let Some(adapter) = &self.prior_art {
                // The retrieval itself is billable, so the balance must
                // cover model + search before the search is attempted.
                if balance < required_credits + self.search_cost {
                    return Err(PipelineError::InsufficientCredits {
                        required: required_credits + self.search_cost,
                        available: balance,
                    });
                }
                let outcome = adapter
                    .retrieve(
                        str_field(&inputs, "title"),
                        str_field(&inputs, "field"),
                        str_field(&inputs, "solution"),
                    )
                    .await;
                if matches!(outcome, PriorArt::Results(_)) {
                    required_credits += self.search_cost;
                }
                prior_art_text = format_prior_art(&outcome);
            } else {
                warn!(job_id = %job.id, "search requested but no adapter configured");
            }
        }

        if balance < required_credits {
            return Err(PipelineError::InsufficientCredits {
                required: required_credits,
                available: balance,
            });
        }

        let ctx = analyze_context(&inputs, &prior_art_text);
        let prompt = template::fill(spec.prompt, &ctx);
        let raw = self.invoke_model(model, &prompt, spec).await?;
        let analysis = repair::parse(&raw)?;

        let updated = self
            .store
            .complete_phase(
                &job.id,
                PhaseResult {
                    phase: Phase::Analyze,
                    data: analysis.clone(),
                    model_used: model.name.to_string(),
                    credits_charged: 0,
                },
            )
            .await?;

        info!(job_id = %updated.id, model = model.name, "analyze phase complete");
        Ok(PhaseReport {
            phase: Phase::Analyze,
            data: analysis,
            credits_required: Some(required_credits),
            credits_deducted: None,
            remaining_credits: None,
            message: "analysis complete".into(),
        })
    }

    /// Think: requires `analysis`; embeds it in the prompt, invokes with
    /// streaming, repair-parses, persists `thinking`. Not billed.
    pub async fn think(&self, req: PhaseRequest) -> Result<PhaseReport, PipelineError> {
        let job = self.load_job(&req.job_id).await?;
        let spec = &self.plan.think;
        let inputs = effective_inputs(&req, &job);

        let analysis = job.result_data.analysis.clone().ok_or(
            PipelineError::MissingPriorPhase {
                phase: "think",
                missing: "analysis",
            },
        )?;

        let model = self.resolve_model(req.model_name.as_deref())?;
        let ctx = think_context(&inputs, &analysis);
        let prompt = template::fill(spec.prompt, &ctx);
        let raw = self.invoke_model(model, &prompt, spec).await?;
        let thinking = repair::parse(&raw)?;

        let updated = self
            .store
            .complete_phase(
                &job.id,
                PhaseResult {
                    phase: Phase::Think,
                    data: thinking.clone(),
                    model_used: model.name.to_string(),
                    credits_charged: 0,
                },
            )
            .await?;

        info!(job_id = %updated.id, model = model.name, "think phase complete");
        Ok(PhaseReport {
            phase: Phase::Think,
            data: thinking,
            credits_required: None,
            credits_deducted: None,
            remaining_credits: None,
            message: "drafting structure complete".into(),
        })
    }

    /// Write: requires both prior results. Credits are deducted first,
    /// atomically, so a paid provider call is never issued unbilled. The
    /// output is prose and is persisted raw.
    pub async fn write(&self, req: PhaseRequest) -> Result<PhaseReport, PipelineError> {
        let job = self.load_job(&req.job_id).await?;
        let spec = &self.plan.write;
        let inputs = effective_inputs(&req, &job);

        let analysis = job.result_data.analysis.clone().ok_or(
            PipelineError::MissingPriorPhase {
                phase: "write",
                missing: "analysis",
            },
        )?;
        let thinking = job.result_data.thinking.clone().ok_or(
            PipelineError::MissingPriorPhase {
                phase: "write",
                missing: "thinking",
            },
        )?;

        let model = self.resolve_model(req.model_name.as_deref())?;
        let required_credits = model.cost_per_request;

        // Deduct-then-call ordering. A provider failure after this point
        // does not refund; retrying the phase replays the idempotency key
        // and is not charged again.
        let receipt = self
            .ledger
            .deduct(DeductRequest {
                account: job.account.clone(),
                amount: required_credits,
                reason: format!("{} draft generation", model.display_name),
                job_reference: job.id.clone(),
                idempotency_key: format!("{}:{}", job.id, spec.phase.name()),
            })
            .await?;

        info!(
            job_id = %job.id,
            credits = required_credits,
            remaining = receipt.new_balance,
            "credits deducted"
        );

        let ctx = write_context(&inputs, &analysis, &thinking);
        let prompt = template::fill(spec.prompt, &ctx);
        let draft = self.invoke_model(model, &prompt, spec).await?;

        let updated = self
            .store
            .complete_phase(
                &job.id,
                PhaseResult {
                    phase: Phase::Write,
                    data: Value::String(draft.clone()),
                    model_used: model.name.to_string(),
                    credits_charged: required_credits,
                },
            )
            .await?;

        info!(job_id = %updated.id, model = model.name, draft_len = draft.len(), "write phase complete");
        Ok(PhaseReport {
            phase: Phase::Write,
            data: Value::String(draft),
            credits_required: None,
            credits_deducted: Some(required_credits),
            remaining_credits: Some(receipt.new_balance),
            message: "draft complete".into(),
        })
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    async fn load_job(&self, id: &str) -> Result<Job, PipelineError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| PipelineError::JobNotFound(id.to_string()))
    }

    fn resolve_model(&self, name: Option<&str>) -> Result<&ModelConfig, PipelineError> {
        match name {
            Some(n) => self.registry.lookup(n),
            None => Ok(self.registry.default_model()),
        }
    }

    async fn invoke_model(
        &self,
        model: &ModelConfig,
        prompt: &str,
        spec: &PhaseSpec,
    ) -> Result<String, PipelineError> {
        info!(
            provider = model.provider.name(),
            model = model.api_model,
            phase = spec.phase.name(),
            streaming = spec.streaming && model.streaming,
            prompt_len = prompt.len(),
            "invoking provider"
        );
        self.providers
            .client(model.provider)
            .invoke(InvokeRequest {
                prompt,
                temperature: spec.temperature,
                model_id: model.api_model,
                streaming: spec.streaming && model.streaming,
            })
            .await
    }
}

// ── Prompt context assembly ──────────────────────────────────────────────

fn effective_inputs(req: &PhaseRequest, job: &Job) -> Value {
    match req.inputs.as_object() {
        Some(map) if !map.is_empty() => req.inputs.clone(),
        _ => job.input_data.clone(),
    }
}

/// Fields are missing when absent, null, or an empty string.
fn missing_fields(inputs: &Value, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|f| match inputs.get(**f) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        })
        .map(|f| (*f).to_string())
        .collect()
}

fn str_field<'a>(inputs: &'a Value, key: &str) -> &'a str {
    inputs.get(key).and_then(Value::as_str).unwrap_or("")
}

fn analyze_context(inputs: &Value, prior_art: &str) -> Value {
    let mut ctx = inputs.clone();
    if let Some(map) = ctx.as_object_mut() {
        map.insert("prior_art".into(), Value::String(prior_art.to_string()));
    }
    ctx
}

fn think_context(inputs: &Value, analysis: &Value) -> Value {
    let mut ctx = inputs.clone();
    if let Some(map) = ctx.as_object_mut() {
        let pretty =
            serde_json::to_string_pretty(analysis).unwrap_or_else(|_| analysis.to_string());
        map.insert("analysis_json".into(), Value::String(pretty));
    }
    ctx
}

/// The write prompt references `thinking_json` by dotted path, so the parsed
/// structure goes in as an object; the analysis is embedded whole.
fn write_context(inputs: &Value, analysis: &Value, thinking: &Value) -> Value {
    let mut ctx = inputs.clone();
    if let Some(map) = ctx.as_object_mut() {
        let pretty =
            serde_json::to_string_pretty(analysis).unwrap_or_else(|_| analysis.to_string());
        map.insert("analysis_json".into(), Value::String(pretty));
        map.insert("thinking_json".into(), thinking.clone());
    }
    ctx
}
