//! Anthropic Messages API provider adapter.

use async_trait::async_trait;
use futures::StreamExt;
use summarize_core::{Error, Result, Usage};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::provider::{GenerateRequest, GenerateResponse, LlmProvider, StreamDelta};

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String) -> Self {
        Self { client: reqwest::Client::new(), api_key, base_url: "https://api.anthropic.com/v1".into() }
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    fn body(&self, request: &GenerateRequest, stream: bool) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .filter(|m| m.role != summarize_core::Role::System)
            .map(|m| {
                serde_json::json!({
                    "role": if m.role == summarize_core::Role::Assistant { "assistant" } else { "user" },
                    "content": m.text_content(),
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": &request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": messages,
        });
        if let Some(system) = &request.system {
            body["system"] = serde_json::json!(system);
        }
        if stream {
            body["stream"] = serde_json::json!(true);
        }
        body
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let body = self.body(request, false);
        debug!(model = %request.model, "anthropic messages request");
        let resp = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2024-10-22")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(Error::RateLimited { retry_after_secs: 30 });
            }
            return Err(Error::Http(format!("HTTP {status}: {text}")));
        }

        let data: serde_json::Value = resp.json().await.map_err(|e| Error::Http(e.to_string()))?;
        let text = data["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b["type"] == "text")
                    .filter_map(|b| b["text"].as_str())
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
                total: None,
            },
        })
    }

    async fn stream(&self, request: &GenerateRequest) -> Result<mpsc::Receiver<StreamDelta>> {
        let mut body = self.body(request, true);
        body["stream"] = serde_json::json!(true);
        let (tx, rx) = mpsc::channel(256);
        let req = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2024-10-22")
            .json(&body);

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
            let mut input_tokens = None;
            let mut output_tokens = None;

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
                    let Ok(event) = serde_json::from_str::<serde_json::Value>(&line[6..]) else { continue };
                    match event["type"].as_str() {
                        Some("message_start") => {
                            input_tokens = event["message"]["usage"]["input_tokens"].as_u64();
                        }
                        Some("content_block_delta") => {
                            if event["delta"]["type"] == "text_delta" {
                                if let Some(text) = event["delta"]["text"].as_str() {
                                    let _ = tx.send(StreamDelta::Text(text.to_string())).await;
                                }
                            }
                        }
                        Some("message_delta") => {
                            output_tokens = event["usage"]["output_tokens"].as_u64().or(output_tokens);
                        }
                        Some("message_stop") => {
                            let _ = tx.send(StreamDelta::Usage(Usage { prompt: input_tokens, completion: output_tokens, total: None })).await;
                            let _ = tx.send(StreamDelta::Done).await;
                            return;
                        }
                        Some("error") => {
                            let msg = event["error"]["message"].as_str().unwrap_or("unknown error");
                            let _ = tx.send(StreamDelta::Error(msg.to_string())).await;
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

    async fn health_check(&self) -> Result<()> {
        info!("checking anthropic credentials");
        if self.api_key.is_empty() {
            return Err(Error::ModelAccessRejection { model: "anthropic".into(), reason: "ANTHROPIC_API_KEY not set".into() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_base_url_overrides_default() {
        let p = AnthropicProvider::new("k".into()).with_base_url("https://proxy.example/anthropic".into());
        assert_eq!(p.base_url, "https://proxy.example/anthropic");
    }
}
