use serde::{Deserialize, Serialize};

/// Who produced a message in a prompt sent to an `LlmProvider`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A tagged content tree — the extractor produces attachments (images from
/// slides, downloaded media) alongside plain text, so a prompt message is
/// modeled as a sum type with an explicit `media_type` rather than an
/// inheritance hierarchy of content classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: String },
    Image { data: String, media_type: String },
    File { path: String, media_type: Option<String> },
}

/// A single message in a prompt sent to an `LlmProvider`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<MessageContent>,
}

impl Message {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![MessageContent::Text { text: text.into() }],
        }
    }

    /// Extract all text content joined together.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                MessageContent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Rough token estimate (~4 chars per token), used to decide whether
    /// content must be refused or map-reduced before an LLM call.
    pub fn estimate_tokens(&self) -> usize {
        let mut chars = 16usize; // role marker overhead
        for block in &self.content {
            match block {
                MessageContent::Text { text } => chars += text.len(),
                MessageContent::Image { data, .. } => chars += data.len().min(1000),
                MessageContent::File { path, .. } => chars += path.len(),
            }
        }
        (chars / 4).max(1)
    }
}

/// Estimate the token count of a plain string using the same heuristic.
pub fn estimate_tokens(text: &str) -> u64 {
    ((text.len() / 4).max(1)) as u64
}
