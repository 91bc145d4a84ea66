//! OpenAI chat-completions client. Non-streaming only in this deployment.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use patentflow_core::error::PipelineError;
use patentflow_core::provider::{InvokeRequest, ProviderClient};

const PROVIDER: &str = "openai";
const MAX_TOKENS: u32 = 16_000;

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com".into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn chat_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }
}

fn extract_text(res: ChatResponse) -> Result<String, PipelineError> {
    res.choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| PipelineError::response_shape(PROVIDER))
}

#[async_trait]
impl ProviderClient for OpenAiClient {
    async fn invoke(&self, req: InvokeRequest<'_>) -> Result<String, PipelineError> {
        let body = ChatRequest {
            model: req.model_id,
            messages: vec![ChatMessage {
                role: "user",
                content: req.prompt,
            }],
            temperature: req.temperature,
            max_tokens: MAX_TOKENS,
        };

        let res = self
            .http
            .post(self.chat_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(PipelineError::provider(PROVIDER, status.as_u16(), body));
        }

        let parsed: ChatResponse = res.json().await?;
        extract_text(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let body = ChatRequest {
            model: "gpt-5",
            messages: vec![ChatMessage {
                role: "user",
                content: "p",
            }],
            temperature: 0.3,
            max_tokens: MAX_TOKENS,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["model"], "gpt-5");
        assert_eq!(v["max_tokens"], 16000);
        assert_eq!(v["messages"][0]["content"], "p");
    }

    #[test]
    fn test_extract_text() {
        let res: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"out"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(res).unwrap(), "out");
    }

    #[test]
    fn test_empty_choices_is_shape_error() {
        let res: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            extract_text(res),
            Err(PipelineError::ResponseShape { .. })
        ));
    }
}
