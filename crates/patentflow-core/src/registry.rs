//! Static model registry: model name → provider, wire id, cost, capabilities.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Which vendor API serves a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    OpenAi,
    Gemini,
}

impl Provider {
    pub fn name(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }
}

/// Pricing tier shown to users when picking a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Economy,
    Standard,
    Premium,
}

/// Immutable registry entry for one model. Never mutated at runtime.
#[derive(Debug, Clone, Serialize)]
pub struct ModelConfig {
    pub name: &'static str,
    pub provider: Provider,
    /// Model identifier on the vendor's wire contract.
    pub api_model: &'static str,
    /// Credits charged per invocation of a billed phase.
    pub cost_per_request: i64,
    pub display_name: &'static str,
    pub tier: Tier,
    /// Whether the vendor contract supports event-streamed responses.
    pub streaming: bool,
}

/// Lookup table over the fixed model set. Constructed once and passed into
/// the pipeline; nothing reads it from global scope.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: HashMap<&'static str, ModelConfig>,
    default_model: &'static str,
}

impl ModelRegistry {
    pub fn new(models: Vec<ModelConfig>, default_model: &'static str) -> Self {
        Self {
            models: models.into_iter().map(|m| (m.name, m)).collect(),
            default_model,
        }
    }

    /// The built-in nine-model table: three tiers, three providers each.
    pub fn builtin() -> Self {
        let models = vec![
            // Economy tier
            ModelConfig {
                name: "claude-haiku-4.5",
                provider: Provider::Anthropic,
                api_model: "claude-haiku-4-5-20251001",
                cost_per_request: 50,
                display_name: "Claude Haiku 4.5",
                tier: Tier::Economy,
                streaming: true,
            },
            ModelConfig {
                name: "gpt-5-mini",
                provider: Provider::OpenAi,
                api_model: "gpt-5-mini",
                cost_per_request: 50,
                display_name: "GPT-5 Mini",
                tier: Tier::Economy,
                streaming: false,
            },
            ModelConfig {
                name: "gemini-flash-2.5",
                provider: Provider::Gemini,
                api_model: "gemini-2.5-flash",
                cost_per_request: 50,
                display_name: "Gemini 2.5 Flash",
                tier: Tier::Economy,
                streaming: false,
            },
            // Standard tier
            ModelConfig {
                name: "claude-sonnet-4.5",
                provider: Provider::Anthropic,
                api_model: "claude-sonnet-4-5-20250929",
                cost_per_request: 150,
                display_name: "Claude Sonnet 4.5",
                tier: Tier::Standard,
                streaming: true,
            },
            ModelConfig {
                name: "gemini-pro-2.5",
                provider: Provider::Gemini,
                api_model: "gemini-2.5-pro",
                cost_per_request: 150,
                display_name: "Gemini 2.5 Pro",
                tier: Tier::Standard,
                streaming: false,
            },
            ModelConfig {
                name: "gpt-5",
                provider: Provider::OpenAi,
                api_model: "gpt-5",
                cost_per_request: 150,
                display_name: "GPT-5",
                tier: Tier::Standard,
                streaming: false,
            },
            // Premium tier
            ModelConfig {
                name: "claude-opus-4.5",
                provider: Provider::Anthropic,
                api_model: "claude-opus-4-5-20251101",
                cost_per_request: 300,
                display_name: "Claude Opus 4.5",
                tier: Tier::Premium,
                streaming: true,
            },
            ModelConfig {
                name: "gpt-5.2",
                provider: Provider::OpenAi,
                api_model: "gpt-5.2",
                cost_per_request: 300,
                display_name: "GPT-5.2",
                tier: Tier::Premium,
                streaming: false,
            },
            ModelConfig {
                name: "gemini-3-pro",
                provider: Provider::Gemini,
                api_model: "gemini-3-pro-preview",
                cost_per_request: 300,
                display_name: "Gemini 3 Pro",
                tier: Tier::Premium,
                streaming: false,
            },
        ];
        Self::new(models, "gemini-flash-2.5")
    }

    pub fn lookup(&self, name: &str) -> Result<&ModelConfig, PipelineError> {
        self.models
            .get(name)
            .ok_or_else(|| PipelineError::UnknownModel(name.to_string()))
    }

    /// Model used when a request does not name one.
    pub fn default_model(&self) -> &ModelConfig {
        &self.models[self.default_model]
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_model() {
        let reg = ModelRegistry::builtin();
        let m = reg.lookup("claude-sonnet-4.5").unwrap();
        assert_eq!(m.provider, Provider::Anthropic);
        assert_eq!(m.api_model, "claude-sonnet-4-5-20250929");
        assert_eq!(m.cost_per_request, 150);
        assert!(m.streaming);
    }

    #[test]
    fn test_lookup_unknown_model_fails() {
        let reg = ModelRegistry::builtin();
        match reg.lookup("gpt-2") {
            Err(PipelineError::UnknownModel(name)) => assert_eq!(name, "gpt-2"),
            other => panic!("expected UnknownModel, got {other:?}"),
        }
    }

    #[test]
    fn test_builtin_has_nine_models() {
        let reg = ModelRegistry::builtin();
        assert_eq!(reg.len(), 9);
    }

    #[test]
    fn test_default_model() {
        let reg = ModelRegistry::builtin();
        assert_eq!(reg.default_model().name, "gemini-flash-2.5");
    }
}
