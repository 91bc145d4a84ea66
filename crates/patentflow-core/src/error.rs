//! Error taxonomy for the drafting pipeline.

use thiserror::Error;

/// Errors surfaced by pipeline phases and the components they drive.
///
/// Validation and configuration failures are raised before any paid provider
/// call is issued. Provider failures carry full diagnostic detail; the
/// pipeline never retries them (retry is a caller decision).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Required input fields are missing from the request.
    #[error("missing required input fields: {}", missing.join(", "))]
    Validation { missing: Vec<String> },

    /// The requested model name is not in the registry.
    #[error("unsupported model: {0}")]
    UnknownModel(String),

    /// A vendor API returned a non-success HTTP status.
    #[error("{provider} API error ({status}): {body}")]
    Provider {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// A vendor responded with success but the expected text field was absent.
    #[error("{provider} response missing expected content")]
    ResponseShape { provider: &'static str },

    /// Model output could not be parsed as JSON after all repair passes.
    #[error("model output is not parseable JSON")]
    MalformedOutput { head: String, tail: String },

    /// The account balance cannot cover the requested deduction.
    #[error("insufficient credits: need {required}, have {available}")]
    InsufficientCredits { required: i64, available: i64 },

    /// A phase was invoked before its prerequisite phase completed.
    #[error("phase '{phase}' requires a prior '{missing}' result")]
    MissingPriorPhase {
        phase: &'static str,
        missing: &'static str,
    },

    /// Writing a phase result to the job store failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// No job exists with the given id.
    #[error("job not found: {0}")]
    JobNotFound(String),

    /// Transport-level HTTP failure (connect, timeout, body read).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A phase exceeded its hosting-boundary deadline.
    #[error("phase '{phase}' timed out after {seconds}s")]
    Timeout { phase: &'static str, seconds: u64 },
}

impl PipelineError {
    pub fn validation(missing: Vec<String>) -> Self {
        Self::Validation { missing }
    }

    pub fn provider(provider: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self::Provider {
            provider,
            status,
            body: body.into(),
        }
    }

    pub fn response_shape(provider: &'static str) -> Self {
        Self::ResponseShape { provider }
    }

    /// Build a `MalformedOutput` with bounded excerpts of the original text.
    pub fn malformed_output(raw: &str) -> Self {
        Self::MalformedOutput {
            head: raw.chars().take(1000).collect(),
            tail: tail_chars(raw, 500),
        }
    }
}

fn tail_chars(s: &str, n: usize) -> String {
    let count = s.chars().count();
    s.chars().skip(count.saturating_sub(n)).collect()
}
