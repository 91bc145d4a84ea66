//! The provider gateway seam: one `invoke` contract, one client per vendor.

use async_trait::async_trait;

use crate::error::PipelineError;

/// A single completion request, already templated.
#[derive(Debug, Clone)]
pub struct InvokeRequest<'a> {
    pub prompt: &'a str,
    pub temperature: f32,
    /// Model identifier on the vendor's wire contract.
    pub model_id: &'a str,
    /// Request an event-streamed response where the vendor supports it.
    /// Clients without a streaming contract perform a normal request.
    pub streaming: bool,
}

/// Uniform interface over the vendor APIs. Adding a provider means adding
/// one implementation, not touching a dispatch switch.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Issue one completion and return the full response text.
    async fn invoke(&self, req: InvokeRequest<'_>) -> Result<String, PipelineError>;
}
