pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod sse;
pub mod websearch;

pub use anthropic::AnthropicClient;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use websearch::GoogleSearchClient;
