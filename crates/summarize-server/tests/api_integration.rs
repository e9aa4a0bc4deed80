use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use summarize_cache::{MediaCache, MetadataCache};
use summarize_config::Config;
use summarize_core::{Result, RuntimeContext, VerifyMode};
use summarize_extract::extractor::{Extractor, ExtractorConfig};
use summarize_extract::transcriber::NoTranscriber;
use summarize_llm::{ContextWindowTable, LlmProvider, ModelId, ModelRegistry};
use summarize_run::{Orchestrator, ProviderResolver, RunRegistry};
use summarize_server::{AppState, build_router};
use summarize_slides::SlidesLockTable;
use tower::ServiceExt;

struct NoProvider;
impl ProviderResolver for NoProvider {
    fn provider_for(&self, _model_id: &ModelId) -> Option<Arc<dyn LlmProvider>> {
        None
    }
}

fn test_state() -> (tempfile::TempDir, Arc<AppState>) {
    let dir = tempfile::tempdir().unwrap();
    let transcript_cache = Arc::new(MetadataCache::open_in_memory(10_000_000, 86_400_000).unwrap());
    let content_cache = Arc::new(MetadataCache::open_in_memory(10_000_000, 86_400_000).unwrap());
    let summary_cache = Arc::new(MetadataCache::open_in_memory(10_000_000, 86_400_000).unwrap());
    let media_cache = Arc::new(MediaCache::open(dir.path(), 10_000_000, 86_400_000, VerifyMode::None).unwrap());

    let extractor = Extractor::new(
        transcript_cache,
        media_cache,
        ExtractorConfig {
            timeout: std::time::Duration::from_secs(5),
            firecrawl_api_key: None,
            apify_token: None,
            markdown_llm: None,
            transcriber: Arc::new(NoTranscriber),
        },
    )
    .unwrap();

    let config = Config::default();
    let orchestrator = Orchestrator {
        extractor: Arc::new(extractor),
        content_cache,
        summary_cache,
        model_registry: Arc::new(ModelRegistry::new(config)),
        provider_resolver: Arc::new(NoProvider),
        context_windows: ContextWindowTable::built_in(),
        slides: None,
        slides_output_dir: dir.path().join("slides"),
        slides_locks: Arc::new(SlidesLockTable::new()),
        runtime: RuntimeContext::with_env(HashMap::new()),
    };

    let state = Arc::new(AppState {
        orchestrator: Arc::new(orchestrator),
        run_registry: RunRegistry::new(),
        token: "test-token".to_string(),
        slides_output_dir: dir.path().join("slides"),
        started_at_ms: 0,
    });
    (dir, state)
}

#[tokio::test]
async fn health_is_reachable_without_auth() -> Result<()> {
    let (_dir, state) = test_state();
    let router = build_router(state);

    let response = router.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn protected_route_rejects_missing_token() -> Result<()> {
    let (_dir, state) = test_state();
    let router = build_router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/v1/summarize")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"url":"https://example.com","mode":"url"}"#))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn protected_route_rejects_wrong_token() -> Result<()> {
    let (_dir, state) = test_state();
    let router = build_router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/v1/summarize")
        .header("authorization", "Bearer not-the-token")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"url":"https://example.com","mode":"url"}"#))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn summarize_rejects_extract_only_with_page_mode() -> Result<()> {
    let (_dir, state) = test_state();
    let router = build_router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/v1/summarize")
        .header("authorization", "Bearer test-token")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"url":"https://example.com","mode":"page","text":"hello","title":"t","extractOnly":true}"#))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
