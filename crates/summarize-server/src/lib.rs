//! The summarize daemon (§4.8): a local HTTP server exposing the same
//! pipeline the one-shot CLI drives, for front-ends (browser
//! extensions, editor plugins) that want a long-running process with
//! SSE progress instead of a blocking process spawn per request.
//!
//! Every route except the liveness ping requires `Authorization: Bearer
//! <token>` with the token minted into `~/.summarize/daemon.json` at
//! daemon start.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, Request, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response, Sse, sse::Event},
    routing::get,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use summarize_config::RuleContext;
use summarize_core::{Error, ExtractedContent, RunId, RunState, SseEvent, SummaryLength};
use summarize_run::{Orchestrator, RunOptions, RunRegistry};
use summarize_slides::manifest;
use tracing::{info, warn};

/// Shared daemon state, built once at startup and cloned per request via
/// `Arc`.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub run_registry: RunRegistry,
    pub token: String,
    pub slides_output_dir: PathBuf,
    pub started_at_ms: i64,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/v1/summarize", axum::routing::post(summarize_handler))
        .route("/v1/summarize/{id}/events", get(events_handler))
        .route("/v1/slides/{source_id}/{index}", get(slide_image_handler))
        .route("/v1/slides/{run_id}/snapshot", get(slides_snapshot_handler))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().route("/health", get(health_handler)).merge(protected).with_state(state)
}

pub async fn start_server(listen: &str, state: Arc<AppState>) -> summarize_core::Result<()> {
    let router = build_router(state);
    info!(listen, "starting summarize daemon");
    let listener = tokio::net::TcpListener::bind(listen).await.map_err(|e| Error::Other(format!("failed to bind {listen}: {e}")))?;
    axum::serve(listener, router).await.map_err(|e| Error::Other(format!("server error: {e}")))?;
    Ok(())
}

async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request<axum::body::Body>,
    next: Next,
) -> std::result::Result<Response, StatusCode> {
    let provided = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).and_then(|v| v.strip_prefix("Bearer "));
    match provided {
        Some(token) if token == state.token => Ok(next.run(request).await),
        _ => {
            warn!("rejected request with missing or invalid bearer token");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: i64,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let now = chrono::Utc::now().timestamp_millis();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: (now - state.started_at_ms).max(0) / 1000,
    })
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RequestMode {
    Url,
    Page,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummarizeRequest {
    url: String,
    mode: RequestMode,
    title: Option<String>,
    text: Option<String>,
    truncated: Option<bool>,
    model: Option<String>,
    length: Option<String>,
    language: Option<String>,
    prompt: Option<String>,
    max_characters: Option<u32>,
    extract_only: Option<bool>,
}

#[derive(Serialize)]
struct SummarizeAccepted {
    ok: bool,
    id: RunId,
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
}

fn bad_request(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorBody { ok: false, error: message.into() })).into_response()
}

/// Host-based classification the daemon uses to pick a preset's `when`
/// rule before extraction has run and can tell YouTube from a generic
/// website for certain (§4.1 `RuleContext`).
fn classify_rule_context(url: &str) -> RuleContext {
    let is_youtube = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .map(|host| host.ends_with("youtube.com") || host.ends_with("youtu.be"))
        .unwrap_or(false);
    if is_youtube {
        RuleContext::Youtube
    } else {
        match summarize_core::UrlKind::classify(url) {
            summarize_core::UrlKind::Asset => RuleContext::Asset,
            summarize_core::UrlKind::Website => RuleContext::Website,
        }
    }
}

/// `POST /v1/summarize` (§4.8): accepts a job and returns immediately
/// with `{ok, id}`; the run itself proceeds on a detached task and
/// reports progress through the SSE event stream.
async fn summarize_handler(State(state): State<Arc<AppState>>, Json(req): Json<SummarizeRequest>) -> Response {
    let extract_only = req.extract_only.unwrap_or(false);
    if extract_only && matches!(req.mode, RequestMode::Page) {
        return bad_request("extractOnly is only valid when mode=url");
    }

    let length = match req.length.as_deref() {
        Some(raw) => match SummaryLength::parse(raw) {
            Some(l) => l,
            None => return bad_request(format!("unknown length '{raw}'")),
        },
        None => SummaryLength::default(),
    };

    let options = RunOptions {
        model_or_preset: req.model.clone().unwrap_or_else(|| "auto".to_string()),
        length,
        language: req.language.clone().unwrap_or_else(|| "en".to_string()),
        rule_context: classify_rule_context(&req.url),
        extract_only,
        prompt: req.prompt.clone(),
        max_characters: req.max_characters,
        ..Default::default()
    };

    let now_ms = chrono::Utc::now().timestamp_millis();
    let id = state.run_registry.create(req.url.clone(), now_ms).await;
    state.run_registry.set_state(id, RunState::Running).await;

    let state = state.clone();
    tokio::spawn(async move {
        let result = match req.mode {
            RequestMode::Url => state.orchestrator.run(Some(id), Some(&state.run_registry), &req.url, &options).await,
            RequestMode::Page => {
                let text = req.text.clone().unwrap_or_default();
                let extracted = ExtractedContent {
                    url: req.url.clone(),
                    title: req.title.clone().unwrap_or_default(),
                    description: None,
                    site_name: None,
                    total_characters: text.chars().count(),
                    word_count: text.split_whitespace().count(),
                    content: text,
                    truncated: req.truncated.unwrap_or(false),
                    transcript: None,
                    video: None,
                    is_video_only: false,
                    diagnostics: Vec::new(),
                };
                state.orchestrator.run_with_content(Some(id), Some(&state.run_registry), extracted, &options).await
            }
        };

        match result {
            Ok(_) => state.run_registry.set_state(id, RunState::Done).await,
            Err(e) => {
                warn!(run = %id, error = %e, "run failed");
                state.run_registry.push_event(id, SseEvent::Error { message: e.to_string() }).await;
                state.run_registry.set_state(id, RunState::Failed).await;
            }
        }
    });

    (StatusCode::OK, Json(SummarizeAccepted { ok: true, id })).into_response()
}

/// `GET /v1/summarize/{id}/events` (§4.6): replays the log recorded so
/// far, then forwards everything appended from this point on.
async fn events_handler(State(state): State<Arc<AppState>>, Path(id): Path<RunId>) -> std::result::Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>, StatusCode> {
    let (replay, mut rx) = state.run_registry.subscribe(id).await.ok_or(StatusCode::NOT_FOUND)?;

    let stream = async_stream::stream! {
        for event in replay {
            yield Ok(to_sse_event(&event));
            if matches!(event, SseEvent::Done {} | SseEvent::Error { .. }) {
                return;
            }
        }
        while let Ok(event) = rx.recv().await {
            let done = matches!(event, SseEvent::Done {} | SseEvent::Error { .. });
            yield Ok(to_sse_event(&event));
            if done {
                break;
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(axum::response::sse::KeepAlive::new().interval(Duration::from_secs(15))))
}

fn to_sse_event(event: &SseEvent) -> Event {
    Event::default().event(event.name()).data(event.data_json().to_string())
}

/// `GET /v1/slides/{sourceId}/{index}` (§4.8, §8 invariant 2): serves one
/// slide image, rejecting any manifest entry whose path has escaped the
/// configured slides directory.
async fn slide_image_handler(State(state): State<Arc<AppState>>, Path((source_id, index)): Path<(String, u32)>) -> std::result::Result<Response, StatusCode> {
    let slides_dir = manifest::slides_dir_for(&state.slides_output_dir, &source_id);
    let result = manifest::read_manifest(&slides_dir).ok_or(StatusCode::NOT_FOUND)?;
    let slide = result.slides.iter().find(|s| s.index == index).ok_or(StatusCode::NOT_FOUND)?;

    if !path_inside(&slide.image_path, &slides_dir) {
        warn!(source_id, index, "rejected slide image path escaping its slides directory");
        return Err(StatusCode::FORBIDDEN);
    }

    let bytes = tokio::fs::read(&slide.image_path).await.map_err(|_| StatusCode::NOT_FOUND)?;
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "image/png")], bytes).into_response())
}

/// `GET /v1/slides/{runId}/snapshot` (§4.8): the manifest for the slides
/// extraction a run dispatched, once one is known and has been written.
async fn slides_snapshot_handler(State(state): State<Arc<AppState>>, Path(run_id): Path<RunId>) -> std::result::Result<Response, StatusCode> {
    let source_id = state.run_registry.slides_source(run_id).await.ok_or(StatusCode::NOT_FOUND)?;
    let slides_dir = manifest::slides_dir_for(&state.slides_output_dir, &source_id);
    let result = manifest::read_manifest(&slides_dir).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(result).into_response())
}

fn path_inside(path: &std::path::Path, dir: &std::path::Path) -> bool {
    let Ok(canonical_dir) = dir.canonicalize() else { return false };
    match path.canonicalize() {
        Ok(canonical_path) => canonical_path.starts_with(&canonical_dir),
        Err(_) => false,
    }
}
