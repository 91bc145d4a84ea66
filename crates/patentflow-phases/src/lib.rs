//! Phase definitions for the patent drafting pipeline.
//!
//! Each phase pairs a prompt template with its sampling temperature,
//! transport mode and required inputs. The plan is handed to the pipeline at
//! construction; nothing here performs I/O.

pub mod prompts;

use patentflow_core::types::{Phase, PhasePlan, PhaseSpec};

/// Fields the Analyze phase refuses to run without.
pub const ANALYZE_REQUIRED_INPUTS: &[&str] = &["title", "field", "solution"];

/// Analyze runs deterministic-leaning and unstreamed: the response is a
/// bounded JSON document, not long prose.
pub fn analyze_phase() -> PhaseSpec {
    PhaseSpec {
        phase: Phase::Analyze,
        prompt: prompts::ANALYZE_PROMPT,
        temperature: 0.2,
        streaming: false,
        required_inputs: ANALYZE_REQUIRED_INPUTS,
    }
}

/// Think emits a larger JSON architecture; streamed to keep the connection
/// alive over the longer generation.
pub fn think_phase() -> PhaseSpec {
    PhaseSpec {
        phase: Phase::Think,
        prompt: prompts::THINK_PROMPT,
        temperature: 0.2,
        streaming: true,
        required_inputs: &[],
    }
}

/// Write generates prose, so it runs slightly warmer than the structured
/// phases, and streams.
pub fn write_phase() -> PhaseSpec {
    PhaseSpec {
        phase: Phase::Write,
        prompt: prompts::WRITE_PROMPT,
        temperature: 0.3,
        streaming: true,
        required_inputs: &[],
    }
}

/// The standard three-phase drafting plan.
pub fn drafting_plan() -> PhasePlan {
    PhasePlan {
        analyze: analyze_phase(),
        think: think_phase(),
        write: write_phase(),
    }
}
