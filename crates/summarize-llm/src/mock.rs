//! Deterministic mock provider for tests — no HTTP calls.

use async_trait::async_trait;
use std::sync::Mutex;
use summarize_core::{Error, Result, Usage};
use tokio::sync::mpsc;

use crate::provider::{GenerateRequest, GenerateResponse, LlmProvider, StreamDelta};

pub struct MockProvider {
    name: String,
    responses: Mutex<Vec<MockResponse>>,
    pub requests: Mutex<Vec<GenerateRequest>>,
}

#[derive(Clone)]
pub struct MockResponse {
    pub text: String,
    pub usage: Usage,
    pub error: Option<String>,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self { text: String::new(), usage: Usage { prompt: Some(100), completion: Some(50), total: Some(150) }, error: None }
    }
}

impl MockResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Default::default() }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self { error: Some(msg.into()), ..Default::default() }
    }
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), responses: Mutex::new(Vec::new()), requests: Mutex::new(Vec::new()) }
    }

    pub fn with_response(self, text: &str) -> Self {
        self.responses.lock().unwrap().push(MockResponse::text(text));
        self
    }

    pub fn with_error(self, error: &str) -> Self {
        self.responses.lock().unwrap().push(MockResponse::error(error));
        self
    }

    pub fn recorded_request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn next_response(&self) -> MockResponse {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() { MockResponse::text("") } else { responses.remove(0) }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let mock = self.next_response();
        if let Some(err) = mock.error {
            return Err(Error::Other(err));
        }
        Ok(GenerateResponse { text: mock.text, usage: mock.usage })
    }

    async fn stream(&self, request: &GenerateRequest) -> Result<mpsc::Receiver<StreamDelta>> {
        self.requests.lock().unwrap().push(request.clone());
        let mock = self.next_response();
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            if let Some(err) = mock.error {
                let _ = tx.send(StreamDelta::Error(err)).await;
                return;
            }
            for word in mock.text.split_whitespace() {
                let _ = tx.send(StreamDelta::Text(format!("{word} "))).await;
            }
            let _ = tx.send(StreamDelta::Usage(mock.usage)).await;
            let _ = tx.send(StreamDelta::Done).await;
        });
        Ok(rx)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req() -> GenerateRequest {
        GenerateRequest { model: "mock".into(), messages: vec![], system: None, max_tokens: 100, temperature: 0.5 }
    }

    #[tokio::test]
    async fn generate_returns_queued_text() {
        let provider = MockProvider::new("mock").with_response("hello");
        let resp = provider.generate(&req()).await.unwrap();
        assert_eq!(resp.text, "hello");
    }

    #[tokio::test]
    async fn generate_returns_queued_error() {
        let provider = MockProvider::new("mock").with_error("boom");
        assert!(provider.generate(&req()).await.is_err());
    }

    #[tokio::test]
    async fn stream_emits_words_then_usage_then_done() {
        let provider = MockProvider::new("mock").with_response("a b c");
        let mut rx = provider.stream(&req()).await.unwrap();
        let mut deltas = Vec::new();
        while let Some(d) = rx.recv().await {
            deltas.push(d);
        }
        assert!(matches!(deltas.last().unwrap(), StreamDelta::Done));
        assert!(deltas.iter().any(|d| matches!(d, StreamDelta::Usage(_))));
    }

    #[tokio::test]
    async fn requests_are_recorded_in_order() {
        let provider = MockProvider::new("mock").with_response("1").with_response("2");
        let _ = provider.generate(&req()).await;
        let _ = provider.generate(&req()).await;
        assert_eq!(provider.recorded_request_count(), 2);
    }
}
