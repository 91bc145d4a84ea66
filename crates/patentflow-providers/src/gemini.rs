//! Google Gemini generateContent client. Non-streaming only in this
//! deployment; the API key travels as a query parameter per the vendor
//! contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use patentflow_core::error::PipelineError;
use patentflow_core::provider::{InvokeRequest, ProviderClient};

const PROVIDER: &str = "gemini";
const MAX_OUTPUT_TOKENS: u32 = 8_192;

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com".into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{model}:generateContent",
            self.base_url.trim_end_matches('/')
        )
    }
}

fn extract_text(res: GenerateResponse) -> Result<String, PipelineError> {
    res.candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| PipelineError::response_shape(PROVIDER))
}

#[async_trait]
impl ProviderClient for GeminiClient {
    async fn invoke(&self, req: InvokeRequest<'_>) -> Result<String, PipelineError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: req.prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: req.temperature,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let res = self
            .http
            .post(self.generate_url(req.model_id))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(PipelineError::provider(PROVIDER, status.as_u16(), body));
        }

        let parsed: GenerateResponse = res.json().await?;
        extract_text(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: "p" }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["contents"][0]["parts"][0]["text"], "p");
        let temp = v["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temp - 0.2).abs() < 1e-6);
        assert_eq!(v["generationConfig"]["maxOutputTokens"], 8192);
    }

    #[test]
    fn test_extract_text() {
        let res: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"result"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(res).unwrap(), "result");
    }

    #[test]
    fn test_missing_candidates_is_shape_error() {
        let res: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(matches!(
            extract_text(res),
            Err(PipelineError::ResponseShape { .. })
        ));
    }
}
