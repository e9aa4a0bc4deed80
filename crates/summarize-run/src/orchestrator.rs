//! Run flow orchestrator (§4.7): turns one input (URL or pre-fetched
//! page text) into an optional extracted-content echo and/or an LLM
//! summary, fanning slide extraction out in parallel when requested.

use std::sync::Arc;
use summarize_cache::{MetadataCache, Namespace};
use summarize_core::{
    CallPurpose, Error, ExtractSettings, ExtractedContent, Message, Result, Role, RuntimeContext, SseEvent,
    SummaryLength, Usage, VideoKind, language,
};
use summarize_extract::Extractor;
use summarize_llm::{ContextWindowTable, CostBook, GenerateRequest, LlmProvider, ModelId, ModelRegistry};
use summarize_slides::{NoopProgress, SlidesConfig, SlidesLockTable, SlidesPipeline};
use tracing::{info, warn};

use crate::run_registry::RunRegistry;

/// Maximum number of recursions through `extract` when a page turns out
/// to be video-only (§4.7 step 4: "recurse once").
const MAX_VIDEO_ONLY_RECURSIONS: u32 = 1;

const CHUNK_OVERHEAD_FRACTION: f64 = 0.7;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub model_or_preset: String,
    pub length: SummaryLength,
    pub language: String,
    pub rule_context: summarize_config::RuleContext,
    pub extract_settings: ExtractSettings,
    pub extract_only: bool,
    pub prompt: Option<String>,
    pub max_characters: Option<u32>,
    pub max_output_tokens: u32,
    pub slides: bool,
    pub slides_scene_threshold: Option<f32>,
    pub slides_ocr: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            model_or_preset: "auto".to_string(),
            length: SummaryLength::default(),
            language: "en".to_string(),
            rule_context: summarize_config::RuleContext::Website,
            extract_settings: ExtractSettings::default(),
            extract_only: false,
            prompt: None,
            max_characters: None,
            max_output_tokens: 1024,
            slides: false,
            slides_scene_threshold: None,
            slides_ocr: false,
        }
    }
}

pub struct RunOutcome {
    pub extracted: ExtractedContent,
    pub summary: Option<String>,
    pub model_used: Option<String>,
    pub cost_book: CostBook,
}

/// Decouples provider construction from `ModelRegistry` so tests can
/// inject a deterministic provider without touching process env/config.
pub trait ProviderResolver: Send + Sync {
    fn provider_for(&self, model_id: &ModelId) -> Option<Arc<dyn LlmProvider>>;
}

pub struct RegistryResolver {
    pub registry: ModelRegistry,
    pub base_url_flag: Option<String>,
}

impl ProviderResolver for RegistryResolver {
    fn provider_for(&self, model_id: &ModelId) -> Option<Arc<dyn LlmProvider>> {
        self.registry.provider_for(model_id, self.base_url_flag.as_deref())
    }
}

pub struct Orchestrator {
    pub extractor: Arc<Extractor>,
    pub content_cache: Arc<MetadataCache>,
    pub summary_cache: Arc<MetadataCache>,
    pub model_registry: Arc<ModelRegistry>,
    pub provider_resolver: Arc<dyn ProviderResolver>,
    pub context_windows: ContextWindowTable,
    pub slides: Option<Arc<SlidesPipeline>>,
    pub slides_output_dir: std::path::PathBuf,
    pub slides_locks: Arc<SlidesLockTable>,
    pub runtime: RuntimeContext,
}

impl Orchestrator {
    /// Run the full flow for `input_url`. `events` is `Some` when driven
    /// by the daemon (§4.6) and appends `chunk`/`slides`/`status`/`done`
    /// frames as they happen; `None` for a one-shot CLI invocation.
    pub async fn run(
        &self,
        run_id: Option<uuid::Uuid>,
        events: Option<&RunRegistry>,
        input_url: &str,
        options: &RunOptions,
    ) -> Result<RunOutcome> {
        let extracted = self.extract_with_recursion(input_url, &options.extract_settings, 0).await?;
        self.run_from_extracted(run_id, events, extracted, input_url, options).await
    }

    /// Run the flow starting from already-extracted content, skipping the
    /// extractor and its content cache entirely — used by the daemon's
    /// `mode=page` request shape (§4.8), where the caller supplies
    /// `title`/`text` directly instead of a URL to fetch.
    pub async fn run_with_content(
        &self,
        run_id: Option<uuid::Uuid>,
        events: Option<&RunRegistry>,
        extracted: ExtractedContent,
        options: &RunOptions,
    ) -> Result<RunOutcome> {
        let input_url = extracted.url.clone();
        self.run_from_extracted(run_id, events, extracted, &input_url, options).await
    }

    async fn run_from_extracted(
        &self,
        run_id: Option<uuid::Uuid>,
        events: Option<&RunRegistry>,
        extracted: ExtractedContent,
        input_url: &str,
        options: &RunOptions,
    ) -> Result<RunOutcome> {
        let resolved_language = language::resolve(&options.language);

        if options.slides {
            self.spawn_slides(run_id, events, &extracted, input_url, options).await;
        }

        if options.extract_only {
            return Ok(RunOutcome { extracted, summary: None, model_used: None, cost_book: CostBook::new() });
        }

        let normalized = extracted.normalized_content();
        let content_hash = summarize_cache::content_hash(&normalized);
        let prompt_hash = summarize_cache::content_hash(options.prompt.as_deref().unwrap_or(""));
        let summary_key = summarize_cache::summary_key(
            &content_hash,
            &prompt_hash,
            &options.model_or_preset,
            options.length.as_str(),
            &resolved_language.tag,
        );

        if let Some(cached) = self.summary_cache.get(Namespace::Summary, &summary_key)? {
            if let Some(text) = cached.get("summary").and_then(|v| v.as_str()) {
                if let Some(events) = events {
                    if let Some(id) = run_id {
                        events.push_event(id, SseEvent::Chunk { text: text.to_string() }).await;
                    }
                }
                return Ok(RunOutcome {
                    extracted,
                    summary: Some(text.to_string()),
                    model_used: cached.get("model").and_then(|v| v.as_str()).map(str::to_string),
                    cost_book: CostBook::new(),
                });
            }
        }

        let mut cost_book = CostBook::new();
        let candidates = self.model_registry.candidates(&options.model_or_preset, options.rule_context);
        let (summary, model_used) = self
            .summarize(run_id, events, &candidates, &normalized, options, &resolved_language, &mut cost_book)
            .await?;

        self.summary_cache.put(
            Namespace::Summary,
            &summary_key,
            &serde_json::json!({ "summary": summary, "model": model_used }),
        )?;

        if let Some(events) = events {
            if let Some(id) = run_id {
                events.push_event(id, SseEvent::Done {}).await;
            }
        }

        Ok(RunOutcome { extracted, summary: Some(summary), model_used: Some(model_used), cost_book })
    }

    async fn extract_with_recursion(
        &self,
        url: &str,
        settings: &ExtractSettings,
        depth: u32,
    ) -> Result<ExtractedContent> {
        let key = summarize_cache::content_key(url, settings);
        if let Some(cached) = self.content_cache.get(Namespace::Content, &key)? {
            if let Ok(content) = serde_json::from_value::<ExtractedContent>(cached) {
                info!(url, "content cache hit");
                return Ok(content);
            }
        }

        let content = self.extractor.extract(url, settings).await?;
        self.content_cache.put(Namespace::Content, &key, &serde_json::to_value(&content)?)?;

        if content.is_video_only && depth < MAX_VIDEO_ONLY_RECURSIONS {
            if let Some(video) = &content.video {
                info!(url, embedded = %video.url, "page is video-only, recursing once");
                return Box::pin(self.extract_with_recursion(&video.url, settings, depth + 1)).await;
            }
        }

        Ok(content)
    }

    /// Spawn the slides pipeline in its own task (§4.7 step 5): the
    /// summary path never awaits it, and the done-hook fires exactly
    /// once via a `slides` SSE event.
    async fn spawn_slides(
        &self,
        run_id: Option<uuid::Uuid>,
        events: Option<&RunRegistry>,
        extracted: &ExtractedContent,
        input_url: &str,
        options: &RunOptions,
    ) {
        let Some(pipeline) = self.slides.clone() else {
            warn!("slides requested but no slides pipeline configured");
            return;
        };
        let (source_url, source_kind, source_id) = match &extracted.video {
            Some(video) => {
                let id = match video.kind {
                    VideoKind::Youtube => summarize_extract::youtube::extract_video_id(&video.url).unwrap_or_else(|| video.url.clone()),
                    VideoKind::Direct => summarize_slides::ids::direct_media_source_id(&video.url),
                };
                (video.url.clone(), video.kind, id)
            }
            None => {
                if summarize_core::UrlKind::classify(input_url) != summarize_core::UrlKind::Asset {
                    warn!(input_url, "slides requested for a non-media, non-video source; skipping");
                    return;
                }
                (input_url.to_string(), VideoKind::Direct, summarize_slides::ids::direct_media_source_id(input_url))
            }
        };

        let config = SlidesConfig {
            scene_threshold: options.slides_scene_threshold,
            ocr_requested: options.slides_ocr,
            output_dir: self.slides_output_dir.clone(),
            ..Default::default()
        };
        if let (Some(events), Some(id)) = (events, run_id) {
            events.set_slides_source(id, source_id.clone()).await;
        }
        let events = events.cloned();
        let slides_dir = summarize_slides::manifest::slides_dir_for(&config.output_dir, &source_id);
        let locks = self.slides_locks.clone();
        tokio::spawn(async move {
            let _guard = locks.acquire(&slides_dir).await;
            let result = pipeline.extract(&source_url, source_kind, &source_id, &config, &NoopProgress).await;
            if let (Some(events), Some(id)) = (events, run_id) {
                match result {
                    Ok(_) => events.push_event(id, SseEvent::Slides { ok: true, error: None }).await,
                    Err(e) => events.push_event(id, SseEvent::Slides { ok: false, error: Some(e.to_string()) }).await,
                }
            }
        });
    }

    #[allow(clippy::too_many_arguments)]
    async fn summarize(
        &self,
        run_id: Option<uuid::Uuid>,
        events: Option<&RunRegistry>,
        candidates: &[String],
        normalized_content: &str,
        options: &RunOptions,
        language: &summarize_core::ResolvedLanguage,
        cost_book: &mut CostBook,
    ) -> Result<(String, String)> {
        let mut last_error: Option<Error> = None;
        for candidate in candidates {
            let Some(model_id) = ModelId::parse(candidate) else { continue };
            let Some(provider) = self.provider_resolver.provider_for(&model_id) else {
                last_error = Some(Error::ModelNotFound(candidate.clone()));
                continue;
            };
            if provider.health_check().await.is_err() {
                last_error = Some(Error::ModelAccessRejection { model: candidate.clone(), reason: "credentials rejected or unreachable".to_string() });
                continue;
            }

            let cap = self.context_windows.cap_for(candidate);
            match self
                .run_map_reduce(run_id, events, provider.as_ref(), &model_id, cap, normalized_content, options, language, cost_book)
                .await
            {
                Ok(text) => return Ok((text, candidate.clone())),
                Err(e @ Error::InputTooLarge { .. }) => return Err(e),
                Err(e) => {
                    warn!(candidate, error = %e, "candidate model failed, trying next");
                    last_error = Some(e);
                }
            }
        }

        let message = last_error.map(|e| e.to_string()).unwrap_or_else(|| "no candidate model produced output".to_string());
        Err(Error::PresetExhausted { preset: options.model_or_preset.clone(), last_error: message })
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_map_reduce(
        &self,
        run_id: Option<uuid::Uuid>,
        events: Option<&RunRegistry>,
        provider: &dyn LlmProvider,
        model_id: &ModelId,
        cap_tokens: u64,
        content: &str,
        options: &RunOptions,
        language: &summarize_core::ResolvedLanguage,
        cost_book: &mut CostBook,
    ) -> Result<String> {
        let usable_chars = ((cap_tokens as f64) * 4.0 * CHUNK_OVERHEAD_FRACTION) as usize;
        self.emit_status(run_id, events, &format!("summarizing with {model_id}")).await;

        let final_text = if content.len() <= usable_chars {
            let messages = vec![Message::text(Role::User, build_summary_instruction(content, options, language))];
            self.call_and_check(provider, model_id, cap_tokens, messages, options.max_output_tokens, true, cost_book).await?
        } else {
            let chunks = chunk_text(content, usable_chars);
            info!(chunks = chunks.len(), "content exceeds model budget, running map-reduce");
            self.emit_status(run_id, events, &format!("summarizing in {} parts", chunks.len())).await;
            let mut notes = Vec::with_capacity(chunks.len());
            for chunk in &chunks {
                let messages = vec![Message::text(Role::User, build_chunk_note_instruction(chunk, language))];
                let note = self.call_and_check(provider, model_id, cap_tokens, messages, options.max_output_tokens, false, cost_book).await?;
                notes.push(note);
            }
            let reduce_prompt = build_reduce_instruction(&notes, options, language);
            let messages = vec![Message::text(Role::User, reduce_prompt)];
            self.call_and_check(provider, model_id, cap_tokens, messages, options.max_output_tokens, true, cost_book).await?
        };

        if final_text.trim().is_empty() {
            warn!("summary came back empty, retrying once");
            self.emit_status(run_id, events, "summary was empty, retrying").await;
            let messages = vec![Message::text(Role::User, build_summary_instruction(content, options, language))];
            let retry = self.call_and_check(provider, model_id, cap_tokens, messages, options.max_output_tokens, true, cost_book).await?;
            if retry.trim().is_empty() {
                return Err(Error::EmptySummary);
            }
            return Ok(retry);
        }

        Ok(final_text)
    }

    async fn emit_status(&self, run_id: Option<uuid::Uuid>, events: Option<&RunRegistry>, message: &str) {
        if let (Some(events), Some(id)) = (events, run_id) {
            events.push_event(id, SseEvent::Status { message: message.to_string() }).await;
        }
    }

    /// Run one LLM call, refusing up front if the request's estimated
    /// token count exceeds the model's cap (§4.7 step 8 — checked per
    /// call, since map-reduce's job is to keep each call under budget).
    /// `stream` selects `provider.stream` (final merge) vs `generate`
    /// (per-chunk notes), per §4.7 step 7 and §9's channel+done-future
    /// mapping.
    async fn call_and_check(
        &self,
        provider: &dyn LlmProvider,
        model_id: &ModelId,
        cap_tokens: u64,
        messages: Vec<Message>,
        max_tokens: u32,
        stream: bool,
        cost_book: &mut CostBook,
    ) -> Result<String> {
        let estimated: u64 = messages.iter().map(|m| m.estimate_tokens() as u64).sum();
        if estimated > cap_tokens {
            return Err(Error::InputTooLarge { model: model_id.to_string(), estimated, cap: cap_tokens });
        }

        let request = GenerateRequest { model: model_id.name.clone(), messages, system: None, max_tokens, temperature: 0.3 };
        let (text, usage) = if stream {
            self.consume_stream(provider, &request).await?
        } else {
            let response = provider.generate(&request).await?;
            (response.text, response.usage)
        };
        cost_book.record(summarize_core::LlmCall {
            provider: model_id.provider.clone(),
            model: model_id.name.clone(),
            usage,
            purpose: if stream { CallPurpose::Summary } else { CallPurpose::ChunkNotes },
        });
        Ok(text)
    }

    async fn consume_stream(&self, provider: &dyn LlmProvider, request: &GenerateRequest) -> Result<(String, Usage)> {
        use summarize_llm::StreamDelta;
        let mut rx = provider.stream(request).await?;
        let mut text = String::new();
        let mut usage = Usage::default();
        while let Some(delta) = rx.recv().await {
            match delta {
                StreamDelta::Text(t) => text = summarize_core::merge_streaming_chunk(&text, &t),
                StreamDelta::Usage(u) => usage = u,
                StreamDelta::Done => break,
                StreamDelta::Error(e) => return Err(Error::Other(e)),
            }
        }
        Ok((text, usage))
    }
}

fn build_summary_instruction(content: &str, options: &RunOptions, language: &summarize_core::ResolvedLanguage) -> String {
    let mut instruction = format!(
        "Summarize the following content in {} (label: {}), targeting about {} characters unless a stricter limit is given below.\n\n",
        language.tag,
        language.label,
        options.length.target_chars()
    );
    if let Some(max) = options.max_characters {
        instruction.push_str(&format!("Hard limit: the summary MUST NOT exceed {max} characters.\n\n"));
    }
    if let Some(prompt) = &options.prompt {
        instruction.push_str(&format!("Additional instructions: {prompt}\n\n"));
    }
    instruction.push_str("Content:\n");
    instruction.push_str(content);
    instruction
}

fn build_chunk_note_instruction(chunk: &str, language: &summarize_core::ResolvedLanguage) -> String {
    format!(
        "Write dense, factual notes (not prose summary) capturing every notable point in this excerpt, in {}. Excerpt:\n\n{chunk}",
        language.tag
    )
}

fn build_reduce_instruction(notes: &[String], options: &RunOptions, language: &summarize_core::ResolvedLanguage) -> String {
    let mut instruction = format!(
        "Merge the following per-section notes into one coherent summary in {} (label: {}), targeting about {} characters unless a stricter limit is given below.\n\n",
        language.tag,
        language.label,
        options.length.target_chars()
    );
    if let Some(max) = options.max_characters {
        instruction.push_str(&format!("Hard limit: the summary MUST NOT exceed {max} characters.\n\n"));
    }
    if let Some(prompt) = &options.prompt {
        instruction.push_str(&format!("Additional instructions: {prompt}\n\n"));
    }
    for (i, note) in notes.iter().enumerate() {
        instruction.push_str(&format!("--- Section {} notes ---\n{note}\n\n", i + 1));
    }
    instruction
}

/// Split `content` into chunks no longer than `max_chars`, breaking on
/// paragraph boundaries where possible so chunk notes stay coherent.
fn chunk_text(content: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    for paragraph in content.split("\n\n") {
        if current.len() + paragraph.len() + 2 > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if paragraph.len() > max_chars {
            for slice in paragraph.as_bytes().chunks(max_chars) {
                chunks.push(String::from_utf8_lossy(slice).to_string());
            }
            continue;
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use summarize_cache::MediaCache;
    use summarize_config::Config;
    use summarize_core::VerifyMode;
    use summarize_extract::transcriber::NoTranscriber;
    use summarize_extract::{ExtractorConfig};
    use summarize_llm::mock::MockProvider;
    use std::time::Duration;

    struct AlwaysMock;
    impl ProviderResolver for AlwaysMock {
        fn provider_for(&self, _model_id: &ModelId) -> Option<Arc<dyn LlmProvider>> {
            Some(Arc::new(MockProvider::new("mock").with_response("a concise summary of the page")))
        }
    }

    fn test_orchestrator(dir: &std::path::Path) -> Orchestrator {
        let transcript_cache = Arc::new(MetadataCache::open_in_memory(10_000_000, 86_400_000).unwrap());
        let media_cache = Arc::new(MediaCache::open(dir, 10_000_000, 86_400_000, VerifyMode::None).unwrap());
        let extractor_config = ExtractorConfig {
            timeout: Duration::from_secs(5),
            firecrawl_api_key: None,
            apify_token: None,
            markdown_llm: None,
            transcriber: Arc::new(NoTranscriber),
        };
        let extractor = Arc::new(Extractor::new(transcript_cache, media_cache, extractor_config).unwrap());
        Orchestrator {
            extractor,
            content_cache: Arc::new(MetadataCache::open_in_memory(10_000_000, 86_400_000).unwrap()),
            summary_cache: Arc::new(MetadataCache::open_in_memory(10_000_000, 86_400_000).unwrap()),
            model_registry: Arc::new(ModelRegistry::new(Config::default())),
            provider_resolver: Arc::new(AlwaysMock),
            context_windows: ContextWindowTable::default(),
            slides: None,
            slides_output_dir: dir.to_path_buf(),
            slides_locks: Arc::new(SlidesLockTable::new()),
            runtime: RuntimeContext::with_env(Default::default()),
        }
    }

    #[test]
    fn chunk_text_respects_max_len_on_oversized_paragraph() {
        let long = "x".repeat(100);
        let chunks = chunk_text(&long, 30);
        assert!(chunks.iter().all(|c| c.len() <= 30));
        assert_eq!(chunks.concat().len(), 100);
    }

    #[test]
    fn chunk_text_keeps_small_paragraphs_together() {
        let content = "a\n\nb\n\nc";
        let chunks = chunk_text(content, 100);
        assert_eq!(chunks.len(), 1);
    }

    #[tokio::test]
    async fn summarize_picks_first_candidate_with_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = test_orchestrator(dir.path());
        let options = RunOptions { model_or_preset: "anthropic/claude-opus-4-6".to_string(), ..Default::default() };
        let mut cost_book = CostBook::new();
        let language = summarize_core::language::resolve("en");
        let (text, model) = orchestrator
            .summarize(None, None, &["anthropic/claude-opus-4-6".to_string()], "some short article content", &options, &language, &mut cost_book)
            .await
            .unwrap();
        assert_eq!(text, "a concise summary of the page");
        assert_eq!(model, "anthropic/claude-opus-4-6");
        assert!(!cost_book.is_empty());
    }

    #[tokio::test]
    async fn oversized_content_is_refused_before_any_llm_call() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = test_orchestrator(dir.path());
        let tiny_cap_model = "anthropic/claude-haiku-3-5";
        let options = RunOptions { model_or_preset: tiny_cap_model.to_string(), ..Default::default() };
        let mut cost_book = CostBook::new();
        let language = summarize_core::language::resolve("en");
        // A chunk note call still estimates far more tokens than a
        // pathologically small cap allows.
        let huge_content = "word ".repeat(2_000_000);
        let result = orchestrator
            .run_map_reduce(
                None,
                None,
                &MockProvider::new("mock"),
                &ModelId::parse(tiny_cap_model).unwrap(),
                1,
                &huge_content,
                &options,
                &language,
                &mut cost_book,
            )
            .await;
        assert!(matches!(result, Err(Error::InputTooLarge { .. })));
    }
}
