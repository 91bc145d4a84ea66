//! Incremental decoder for event-streamed completion responses.
//!
//! The response body arrives as arbitrary byte chunks that do not respect
//! frame boundaries: a `data: {...}` line is routinely split mid-JSON across
//! two reads. The decoder buffers the residual partial line between pushes
//! and only interprets complete lines.

use serde::Deserialize;

use patentflow_core::error::PipelineError;

/// Byte/frame counters handed to the optional progress observer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Progress {
    pub frames: u64,
    pub chars: u64,
}

/// What the caller should do after feeding a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Keep reading from the transport.
    Continue,
    /// The stream signalled completion; stop reading.
    Done,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: Option<Delta>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    text: Option<String>,
}

/// Accumulates the text-bearing delta events of one streamed response.
pub struct SseDecoder {
    provider: &'static str,
    buf: String,
    text: String,
    progress: Progress,
    observer: Option<Box<dyn FnMut(Progress) + Send>>,
}

impl SseDecoder {
    pub fn new(provider: &'static str) -> Self {
        Self {
            provider,
            buf: String::new(),
            text: String::new(),
            progress: Progress::default(),
            observer: None,
        }
    }

    /// Attach a progress observer. Has no effect on decoding output.
    pub fn with_observer(mut self, observer: impl FnMut(Progress) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Feed one transport chunk. Returns `Done` when the stream signalled
    /// its end, or an error if the stream carried an error event.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Control, PipelineError> {
        self.buf.push_str(&String::from_utf8_lossy(chunk));

        // Interpret every complete line; keep the trailing partial line
        // buffered for the next push.
        while let Some(newline) = self.buf.find('\n') {
            let line: String = self.buf.drain(..=newline).collect();
            if self.handle_line(line.trim())? == Control::Done {
                return Ok(Control::Done);
            }
        }
        Ok(Control::Continue)
    }

    /// Transport closed: flush any buffered final line and return the
    /// accumulated text.
    pub fn finish(mut self) -> Result<String, PipelineError> {
        let rest = std::mem::take(&mut self.buf);
        self.handle_line(rest.trim())?;
        Ok(self.text)
    }

    fn handle_line(&mut self, line: &str) -> Result<Control, PipelineError> {
        let Some(payload) = line.strip_prefix("data:") else {
            // `event:` lines, comments and blank keep-alive lines.
            return Ok(Control::Continue);
        };
        let payload = payload.trim();

        if payload.is_empty() {
            return Ok(Control::Continue);
        }
        if payload == "[DONE]" {
            return Ok(Control::Done);
        }

        let event: StreamEvent = match serde_json::from_str(payload) {
            Ok(e) => e,
            // Unknown or malformed frames are skipped, not fatal.
            Err(_) => return Ok(Control::Continue),
        };

        match event.kind.as_str() {
            "content_block_delta" => {
                if let Some(text) = event.delta.and_then(|d| d.text) {
                    self.text.push_str(&text);
                    self.progress.frames += 1;
                    self.progress.chars = self.text.chars().count() as u64;
                    if let Some(observer) = self.observer.as_mut() {
                        observer(self.progress);
                    }
                }
                Ok(Control::Continue)
            }
            "message_stop" => Ok(Control::Done),
            "error" => {
                let body = event
                    .error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| payload.to_string());
                Err(PipelineError::provider(self.provider, 200, body))
            }
            // ping, message_start, content_block_start/stop, message_delta...
            _ => Ok(Control::Continue),
        }
    }

    /// Text accumulated so far (the full response once the stream ended).
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
