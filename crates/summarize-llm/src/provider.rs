//! The provider capability trait (§4.1, §9): every backend — Anthropic,
//! an OpenAI-compatible endpoint, or a test double — exposes the same
//! two operations. Unlike a chat assistant, the pipeline never needs
//! tool use or multi-turn history bookkeeping inside the trait itself;
//! callers build a `Vec<Message>` once per call.

use async_trait::async_trait;
use summarize_core::{Message, Result, Usage};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Provider-native model name, with any `provider/` prefix already
    /// stripped by the caller.
    pub model: String,
    pub messages: Vec<Message>,
    pub system: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub text: String,
    pub usage: Usage,
}

/// One increment of a streamed response. `stream` always terminates with
/// exactly one of `Done` or `Error`.
#[derive(Debug, Clone)]
pub enum StreamDelta {
    Text(String),
    Usage(Usage),
    Done,
    Error(String),
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse>;

    async fn stream(&self, request: &GenerateRequest) -> Result<mpsc::Receiver<StreamDelta>>;

    /// Cheap reachability/credential check, used before committing a
    /// preset candidate (§4.1: "first candidate with credentials").
    async fn health_check(&self) -> Result<()>;
}
