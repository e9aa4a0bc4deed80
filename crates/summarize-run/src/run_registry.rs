//! Run lifecycle registry (§3 `Run`, §4.6, §4.8). Each run is created on
//! `POST /v1/summarize`, transitions monotonically, and carries an
//! append-only event log that both live and replaying subscribers read
//! from — a subscriber connecting before `done` sees events as they
//! arrive; one connecting after sees the full log followed immediately
//! by `done`.

use std::collections::HashMap;
use std::sync::Arc;
use summarize_core::{Run, RunId, RunState, SseEvent};
use tokio::sync::{RwLock, broadcast};

const EVENT_CHANNEL_CAPACITY: usize = 256;

struct RunEntry {
    run: Run,
    sender: broadcast::Sender<SseEvent>,
    /// Set once slide extraction for this run has been dispatched, so
    /// `GET /v1/slides/{runId}/snapshot` (§4.8) knows which `sourceId`
    /// directory to read the manifest from.
    slides_source_id: Option<String>,
}

/// Process-wide table of in-flight and recently-completed runs (§9
/// "file-scope module caches" — held as an owned value by the daemon's
/// top-level state and passed by reference).
#[derive(Clone)]
pub struct RunRegistry {
    runs: Arc<RwLock<HashMap<RunId, RunEntry>>>,
}

impl Default for RunRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RunRegistry {
    pub fn new() -> Self {
        Self { runs: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub async fn create(&self, url: String, created_at_ms: i64) -> RunId {
        let id = uuid::Uuid::new_v4();
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let run = Run::new(id, url, created_at_ms);
        self.runs.write().await.insert(id, RunEntry { run, sender, slides_source_id: None });
        id
    }

    pub async fn get(&self, id: RunId) -> Option<Run> {
        self.runs.read().await.get(&id).map(|e| e.run.clone())
    }

    pub async fn set_state(&self, id: RunId, state: RunState) {
        if let Some(entry) = self.runs.write().await.get_mut(&id) {
            entry.run.state = state;
        }
    }

    /// Append an event to the run's log and broadcast it to live
    /// subscribers. Appending after `done` has already been recorded is a
    /// caller bug (the state machine guarantees monotonic transitions) but
    /// is tolerated here rather than panicking.
    pub async fn push_event(&self, id: RunId, event: SseEvent) {
        let mut runs = self.runs.write().await;
        if let Some(entry) = runs.get_mut(&id) {
            entry.run.events.push(event.clone());
            // No receivers is a normal condition (no one has subscribed
            // yet); the event is still durably recorded for replay.
            let _ = entry.sender.send(event);
        }
    }

    /// Record which `sourceId` directory slide extraction for this run
    /// will write into, once that's known (§4.7 step 5).
    pub async fn set_slides_source(&self, id: RunId, source_id: String) {
        if let Some(entry) = self.runs.write().await.get_mut(&id) {
            entry.slides_source_id = Some(source_id);
        }
    }

    pub async fn slides_source(&self, id: RunId) -> Option<String> {
        self.runs.read().await.get(&id)?.slides_source_id.clone()
    }

    /// Subscribe to a run's events. Returns the events recorded so far
    /// (for replay) plus a receiver for everything appended from this
    /// point forward. Callers should drain the replay vec, then poll the
    /// receiver — `done` is always present in one or the other.
    pub async fn subscribe(&self, id: RunId) -> Option<(Vec<SseEvent>, broadcast::Receiver<SseEvent>)> {
        let runs = self.runs.read().await;
        let entry = runs.get(&id)?;
        Some((entry.run.events.clone(), entry.sender.subscribe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn late_subscriber_receives_full_replay() {
        let registry = RunRegistry::new();
        let id = registry.create("https://example.com".to_string(), 0).await;
        registry.push_event(id, SseEvent::Chunk { text: "a".into() }).await;
        registry.push_event(id, SseEvent::Done {}).await;

        let (replay, _rx) = registry.subscribe(id).await.unwrap();
        assert_eq!(replay.len(), 2);
        assert_eq!(replay[0].name(), "chunk");
        assert_eq!(replay[1].name(), "done");
    }

    #[tokio::test]
    async fn live_subscriber_receives_events_appended_after_subscribe() {
        let registry = RunRegistry::new();
        let id = registry.create("https://example.com".to_string(), 0).await;
        let (replay, mut rx) = registry.subscribe(id).await.unwrap();
        assert!(replay.is_empty());

        registry.push_event(id, SseEvent::Status { message: "working".into() }).await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "status");
    }

    #[tokio::test]
    async fn state_transitions_are_observable() {
        let registry = RunRegistry::new();
        let id = registry.create("https://example.com".to_string(), 0).await;
        registry.set_state(id, RunState::Running).await;
        let run = registry.get(id).await.unwrap();
        assert_eq!(run.state, RunState::Running);
    }
}
