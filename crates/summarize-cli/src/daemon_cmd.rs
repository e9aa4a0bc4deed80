//! `summarize daemon` (§4.8): starts the HTTP server, minting (or
//! reusing) the token recorded at `~/.summarize/daemon.json` (§6).

use std::sync::Arc;
use summarize_config::DaemonState;
use summarize_core::Result;
use summarize_run::RunRegistry;
use summarize_server::{AppState, start_server};

use crate::setup::BuiltPipeline;

pub async fn run(listen: &str, pipeline: BuiltPipeline) -> Result<()> {
    let state_path = DaemonState::resolve_path(None);
    let port: u16 = listen.rsplit(':').next().and_then(|p| p.parse().ok()).unwrap_or(4756);
    let now_ms = chrono::Utc::now().timestamp_millis();
    let daemon_state = match DaemonState::load(&state_path)? {
        Some(existing) => existing,
        None => DaemonState::create(&state_path, port, now_ms)?,
    };

    tracing::info!(listen, token_file = %state_path.display(), "daemon ready");

    let app_state = Arc::new(AppState {
        orchestrator: pipeline.orchestrator,
        run_registry: RunRegistry::new(),
        token: daemon_state.token,
        slides_output_dir: pipeline.slides_output_dir,
        started_at_ms: now_ms,
    });

    start_server(listen, app_state).await
}
