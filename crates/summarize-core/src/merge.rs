//! Streaming merge engine (§4.6). Turns a sequence of LLM token deltas into
//! client-visible progressive text, and defines the SSE event shape shared
//! by stdout rendering and the daemon's SSE bus.

use serde::{Deserialize, Serialize};

/// Merge a newly-received delta into the text accumulated so far.
///
/// Most providers emit pure append deltas, but some replay an overlapping
/// prefix of what they already sent (a "prefix-extension" chunk). This
/// function preserves that exact quirk: if `next` is a prefix-extending
/// delta — i.e. `previous + next` would contain `next` itself as a prefix
/// match at the seam, and `previous` is a prefix of `next` — the longer
/// string wins instead of naively concatenating. Otherwise the two are
/// concatenated.
///
/// This is load-bearing: naively concatenating on a replayed chunk would
/// duplicate text in the hover/popup UX.
pub fn merge_streaming_chunk(previous: &str, next: &str) -> String {
    if next.is_empty() {
        return previous.to_string();
    }
    if previous.is_empty() {
        return next.to_string();
    }
    if next.starts_with(previous) {
        // `next` replays and extends everything seen so far.
        return next.to_string();
    }
    if previous.starts_with(next) {
        // `next` is a strict subset of what's already been emitted — a
        // stale replay. Keep the longer string.
        return previous.to_string();
    }
    format!("{previous}{next}")
}

/// Collapse whitespace for the consumer-facing "cleaned" view. The server
/// state itself always retains the raw concatenation produced by
/// `merge_streaming_chunk`.
pub fn clean_for_display(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One frame in a run's event log. Serializes to the SSE `data:` payload;
/// the SSE `event:` name is the variant's snake_case tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SseEvent {
    Chunk { text: String },
    Error { message: String },
    Slides { ok: bool, error: Option<String> },
    Status { message: String },
    Done {},
}

impl SseEvent {
    /// The `event: <name>` line value.
    pub fn name(&self) -> &'static str {
        match self {
            SseEvent::Chunk { .. } => "chunk",
            SseEvent::Error { .. } => "error",
            SseEvent::Slides { .. } => "slides",
            SseEvent::Status { .. } => "status",
            SseEvent::Done {} => "done",
        }
    }

    /// The JSON `data:` payload, independent of the `event` tag.
    pub fn data_json(&self) -> serde_json::Value {
        match self {
            SseEvent::Chunk { text } => serde_json::json!({ "text": text }),
            SseEvent::Error { message } => serde_json::json!({ "message": message }),
            SseEvent::Slides { ok, error } => serde_json::json!({ "ok": ok, "error": error }),
            SseEvent::Status { message } => serde_json::json!({ "message": message }),
            SseEvent::Done {} => serde_json::json!({}),
        }
    }

    /// Render as a raw `event: ...\ndata: ...\n\n` SSE frame.
    pub fn to_frame(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.name(), self.data_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_idempotent_on_identical_repeats() {
        let s = "hello world";
        assert_eq!(merge_streaming_chunk(s, s), s);
    }

    #[test]
    fn merge_concatenates_plain_deltas() {
        assert_eq!(merge_streaming_chunk("Hello, ", "world"), "Hello, world");
    }

    #[test]
    fn merge_prefers_longer_prefix_extension() {
        assert_eq!(merge_streaming_chunk("Hel", "Hello"), "Hello");
    }

    #[test]
    fn merge_ignores_stale_prefix_replay() {
        assert_eq!(merge_streaming_chunk("Hello", "Hel"), "Hello");
    }

    #[test]
    fn merge_handles_empty_previous() {
        assert_eq!(merge_streaming_chunk("", "abc"), "abc");
    }

    #[test]
    fn sse_event_frame_shape() {
        let e = SseEvent::Chunk { text: "hi".into() };
        let frame = e.to_frame();
        assert!(frame.starts_with("event: chunk\n"));
        assert!(frame.contains("\"text\":\"hi\""));
        assert!(frame.ends_with("\n\n"));
    }
}
