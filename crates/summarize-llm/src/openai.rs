//! OpenAI-compatible provider adapter. Speaks two wire shapes:
//!
//! - the Responses API (`POST /responses`), OpenAI's default, used
//!   whenever no custom base URL is configured;
//! - the Chat Completions API (`POST /chat/completions`), used whenever
//!   a custom base URL is set (Azure, Together, vLLM, openrouter-style
//!   gateways generally only implement this older shape) — §4.1.
//!
//! `openrouter.ai` additionally gets `HTTP-Referer`/`X-Title` headers so
//! it can attribute traffic, per §4.1.

use async_trait::async_trait;
use futures::StreamExt;
use summarize_core::{Error, Result, Usage};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::provider::{GenerateRequest, GenerateResponse, LlmProvider, StreamDelta};

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    use_chat_completions: bool,
    provider_name: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: "https://api.openai.com/v1".into(),
            use_chat_completions: false,
            provider_name: "openai".into(),
        }
    }

    /// A custom base URL implies the chat-completions wire shape (§4.1)
    /// unless explicitly overridden afterward.
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self.use_chat_completions = true;
        self
    }

    pub fn with_chat_completions(mut self, on: bool) -> Self {
        self.use_chat_completions = on;
        self
    }

    pub fn with_provider_name(mut self, name: String) -> Self {
        self.provider_name = name;
        self
    }

    fn is_openrouter(&self) -> bool {
        self.base_url.contains("openrouter.ai")
    }

    fn apply_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        if self.is_openrouter() {
            builder
                .header("HTTP-Referer", "https://github.com/shaneholloman/summarize-rs")
                .header("X-Title", "summarize-rs")
        } else {
            builder
        }
    }

    fn chat_messages(&self, request: &GenerateRequest) -> Vec<serde_json::Value> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(serde_json::json!({"role": "system", "content": system}));
        }
        for msg in &request.messages {
            messages.push(serde_json::json!({
                "role": role_str(msg.role),
                "content": msg.text_content(),
            }));
        }
        messages
    }

    fn chat_body(&self, request: &GenerateRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": &request.model,
            "temperature": request.temperature,
            "messages": self.chat_messages(request),
        });
        if stream {
            body["stream"] = serde_json::json!(true);
            body["stream_options"] = serde_json::json!({"include_usage": true});
        }
        if uses_max_completion_tokens(&request.model) {
            body["max_completion_tokens"] = serde_json::json!(request.max_tokens);
        } else {
            body["max_tokens"] = serde_json::json!(request.max_tokens);
        }
        body
    }

    fn responses_body(&self, request: &GenerateRequest, stream: bool) -> serde_json::Value {
        let mut input = Vec::with_capacity(request.messages.len());
        for msg in &request.messages {
            input.push(serde_json::json!({
                "role": role_str(msg.role),
                "content": msg.text_content(),
            }));
        }
        let mut body = serde_json::json!({
            "model": &request.model,
            "input": input,
            "temperature": request.temperature,
            "max_output_tokens": request.max_tokens,
        });
        if let Some(system) = &request.system {
            body["instructions"] = serde_json::json!(system);
        }
        if stream {
            body["stream"] = serde_json::json!(true);
        }
        body
    }
}

fn role_str(role: summarize_core::Role) -> &'static str {
    match role {
        summarize_core::Role::System => "system",
        summarize_core::Role::User => "user",
        summarize_core::Role::Assistant => "assistant",
    }
}

fn uses_max_completion_tokens(model: &str) -> bool {
    let m = model.to_lowercase();
    m.starts_with("o1") || m.starts_with("o3") || m.starts_with("o4") || m.contains("gpt-5")
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        if self.use_chat_completions {
            self.generate_chat(request).await
        } else {
            self.generate_responses(request).await
        }
    }

    async fn stream(&self, request: &GenerateRequest) -> Result<mpsc::Receiver<StreamDelta>> {
        if self.use_chat_completions {
            self.stream_chat(request).await
        } else {
            self.stream_responses(request).await
        }
    }

    async fn health_check(&self) -> Result<()> {
        info!(provider = %self.provider_name, "checking provider credentials");
        if self.api_key.is_empty() {
            return Err(Error::ModelAccessRejection {
                model: self.provider_name.clone(),
                reason: "no API key configured".into(),
            });
        }
        Ok(())
    }
}

impl OpenAiProvider {
    async fn generate_chat(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let body = self.chat_body(request, false);
        debug!(model = %request.model, provider = %self.provider_name, "chat completions request");
        let resp = self
            .apply_headers(self.client.post(format!("{}/chat/completions", self.base_url)))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        let data = read_json_or_error(resp).await?;
        let choice = &data["choices"][0];
        let text = choice["message"]["content"].as_str().unwrap_or_default().to_string();
        let usage = &data["usage"];
        Ok(GenerateResponse {
            text,
            usage: Usage {
                prompt: usage["prompt_tokens"].as_u64(),
                completion: usage["completion_tokens"].as_u64(),
                total: usage["total_tokens"].as_u64(),
            },
        })
    }

    async fn generate_responses(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let body = self.responses_body(request, false);
        debug!(model = %request.model, provider = %self.provider_name, "responses request");
        let resp = self
            .apply_headers(self.client.post(format!("{}/responses", self.base_url)))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        let data = read_json_or_error(resp).await?;
        let text = data["output"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .flat_map(|item| item["content"].as_array().cloned().unwrap_or_default())
                    .filter_map(|c| c["text"].as_str().map(|s| s.to_string()))
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        let usage = &data["usage"];
        Ok(GenerateResponse {
            text,
            usage: Usage {
                prompt: usage["input_tokens"].as_u64(),
                completion: usage["output_tokens"].as_u64(),
                total: usage["total_tokens"].as_u64(),
            },
        })
    }

    async fn stream_chat(&self, request: &GenerateRequest) -> Result<mpsc::Receiver<StreamDelta>> {
        let body = self.chat_body(request, true);
        let (tx, rx) = mpsc::channel(256);
        let req = self.apply_headers(self.client.post(format!("{}/chat/completions", self.base_url))).json(&body);

        tokio::spawn(async move {
            let resp = match req.send().await {
                Ok(r) => r,
                Err(e) => {
                    let _ = tx.send(StreamDelta::Error(e.to_string())).await;
                    return;
                }
            };
            if !resp.status().is_success() {
                let text = resp.text().await.unwrap_or_default();
                let _ = tx.send(StreamDelta::Error(text)).await;
                return;
            }

            let mut stream = resp.bytes_stream();
            let mut buffer = String::new();
            let mut prompt_tokens = None;
            let mut completion_tokens = None;

            while let Some(chunk) = stream.next().await {
                let Ok(bytes) = chunk else {
                    let _ = tx.send(StreamDelta::Error(chunk.unwrap_err().to_string())).await;
                    return;
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    buffer = buffer[pos + 1..].to_string();
                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }
                    let Some(data) = line.strip_prefix("data: ") else { continue };
                    if data.trim() == "[DONE]" {
                        let _ = tx
                            .send(StreamDelta::Usage(Usage { prompt: prompt_tokens, completion: completion_tokens, total: None }))
                            .await;
                        let _ = tx.send(StreamDelta::Done).await;
                        return;
                    }
                    let Ok(event) = serde_json::from_str::<serde_json::Value>(data) else { continue };
                    if let Some(text) = event["choices"][0]["delta"]["content"].as_str() {
                        if !text.is_empty() {
                            let _ = tx.send(StreamDelta::Text(text.to_string())).await;
                        }
                    }
                    if let Some(usage) = event.get("usage") {
                        prompt_tokens = usage["prompt_tokens"].as_u64().or(prompt_tokens);
                        completion_tokens = usage["completion_tokens"].as_u64().or(completion_tokens);
                    }
                }
            }
            let _ = tx.send(StreamDelta::Done).await;
        });

        Ok(rx)
    }

    async fn stream_responses(&self, request: &GenerateRequest) -> Result<mpsc::Receiver<StreamDelta>> {
        let body = self.responses_body(request, true);
        let (tx, rx) = mpsc::channel(256);
        let req = self.apply_headers(self.client.post(format!("{}/responses", self.base_url))).json(&body);

        tokio::spawn(async move {
            let resp = match req.send().await {
                Ok(r) => r,
                Err(e) => {
                    let _ = tx.send(StreamDelta::Error(e.to_string())).await;
                    return;
                }
            };
            if !resp.status().is_success() {
                let text = resp.text().await.unwrap_or_default();
                let _ = tx.send(StreamDelta::Error(text)).await;
                return;
            }

            let mut stream = resp.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = stream.next().await {
                let Ok(bytes) = chunk else {
                    let _ = tx.send(StreamDelta::Error(chunk.unwrap_err().to_string())).await;
                    return;
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    buffer = buffer[pos + 1..].to_string();
                    if line.is_empty() || line.starts_with(':') || !line.starts_with("data: ") {
                        continue;
                    }
                    let data = &line[6..];
                    let Ok(event) = serde_json::from_str::<serde_json::Value>(data) else { continue };
                    match event["type"].as_str() {
                        Some("response.output_text.delta") => {
                            if let Some(delta) = event["delta"].as_str() {
                                let _ = tx.send(StreamDelta::Text(delta.to_string())).await;
                            }
                        }
                        Some("response.completed") => {
                            let usage = &event["response"]["usage"];
                            let _ = tx
                                .send(StreamDelta::Usage(Usage {
                                    prompt: usage["input_tokens"].as_u64(),
                                    completion: usage["output_tokens"].as_u64(),
                                    total: usage["total_tokens"].as_u64(),
                                }))
                                .await;
                            let _ = tx.send(StreamDelta::Done).await;
                            return;
                        }
                        _ => {}
                    }
                }
            }
            let _ = tx.send(StreamDelta::Done).await;
        });

        Ok(rx)
    }
}

async fn read_json_or_error(resp: reqwest::Response) -> Result<serde_json::Value> {
    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if status.as_u16() == 429 {
            return Err(Error::RateLimited { retry_after_secs: 30 });
        }
        return Err(Error::Http(format!("HTTP {status}: {text}")));
    }
    resp.json().await.map_err(|e| Error::Http(e.to_string()))
}
