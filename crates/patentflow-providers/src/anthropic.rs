//! Anthropic Messages API client. The only vendor contract in the set that
//! supports event-streamed responses.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use patentflow_core::error::PipelineError;
use patentflow_core::provider::{InvokeRequest, ProviderClient};

use crate::sse::{Control, SseDecoder};

const PROVIDER: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 16_000;

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com".into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }

    async fn send(
        &self,
        req: &InvokeRequest<'_>,
        stream: bool,
    ) -> Result<reqwest::Response, PipelineError> {
        let body = MessagesRequest {
            model: req.model_id,
            max_tokens: MAX_TOKENS,
            temperature: req.temperature,
            stream,
            messages: vec![Message {
                role: "user",
                content: req.prompt,
            }],
        };

        let res = self
            .http
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(PipelineError::provider(PROVIDER, status.as_u16(), body));
        }
        Ok(res)
    }

    async fn invoke_streaming(&self, req: &InvokeRequest<'_>) -> Result<String, PipelineError> {
        let mut res = self.send(req, true).await?;

        let mut decoder = SseDecoder::new(PROVIDER).with_observer(|p| {
            if p.frames % 200 == 0 {
                debug!(frames = p.frames, chars = p.chars, "stream progress");
            }
        });

        while let Some(chunk) = res.chunk().await? {
            if decoder.push(&chunk)? == Control::Done {
                break;
            }
        }
        let text = decoder.finish()?;
        info!(chars = text.len(), "streaming response complete");
        Ok(text)
    }

    async fn invoke_blocking(&self, req: &InvokeRequest<'_>) -> Result<String, PipelineError> {
        let res = self.send(req, false).await?;
        let parsed: MessagesResponse = res.json().await?;
        extract_text(parsed)
    }
}

/// Pull the response text out of a non-streaming Messages body.
fn extract_text(res: MessagesResponse) -> Result<String, PipelineError> {
    res.content
        .into_iter()
        .next()
        .and_then(|block| block.text)
        .ok_or_else(|| PipelineError::response_shape(PROVIDER))
}

#[async_trait]
impl ProviderClient for AnthropicClient {
    async fn invoke(&self, req: InvokeRequest<'_>) -> Result<String, PipelineError> {
        if req.streaming {
            self.invoke_streaming(&req).await
        } else {
            self.invoke_blocking(&req).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let body = MessagesRequest {
            model: "claude-haiku-4-5-20251001",
            max_tokens: MAX_TOKENS,
            temperature: 0.2,
            stream: false,
            messages: vec![Message {
                role: "user",
                content: "hello",
            }],
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["model"], "claude-haiku-4-5-20251001");
        assert_eq!(v["max_tokens"], 16000);
        assert_eq!(v["stream"], false);
        assert_eq!(v["messages"][0]["role"], "user");
        assert_eq!(v["messages"][0]["content"], "hello");
    }

    #[test]
    fn test_extract_text() {
        let res: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"the analysis"}],"role":"assistant"}"#,
        )
        .unwrap();
        assert_eq!(extract_text(res).unwrap(), "the analysis");
    }

    #[test]
    fn test_extract_text_missing_field_is_shape_error() {
        let res: MessagesResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert!(matches!(
            extract_text(res),
            Err(PipelineError::ResponseShape { provider: "anthropic" })
        ));
    }
}
