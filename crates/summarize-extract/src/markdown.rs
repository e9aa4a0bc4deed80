//! HTML-to-Markdown conversion via an LLM call (§4.4 step 5), used when
//! `--markdown llm` is requested, or `auto` decides the raw-HTML pass
//! looked low quality.

use summarize_core::{Message, Result, Role};
use summarize_llm::{GenerateRequest, LlmProvider};

const SYSTEM_PROMPT: &str = "Convert the given HTML page into clean Markdown. \
Preserve headings, lists, code blocks, and links. Drop navigation chrome, \
ads, and scripts. Output only the Markdown, no commentary.";

pub async fn convert(provider: &dyn LlmProvider, model: &str, html: &str) -> Result<String> {
    let request = GenerateRequest {
        model: model.to_string(),
        messages: vec![Message::text(Role::User, html)],
        system: Some(SYSTEM_PROMPT.to_string()),
        max_tokens: 8192,
        temperature: 0.0,
    };
    let response = provider.generate(&request).await?;
    Ok(response.text)
}
