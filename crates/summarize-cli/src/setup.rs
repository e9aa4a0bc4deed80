//! Wires a [`summarize_run::Orchestrator`] from a loaded config plus CLI
//! overrides. Shared by the one-shot run path and the daemon command so
//! both construct the pipeline identically (§9 "file-scope module
//! caches" — caches are built once here and passed down by reference).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use summarize_cache::{MediaCache, MetadataCache};
use summarize_config::{Config, ConfigLoader, RuleContext};
use summarize_core::{Error, Result, RuntimeContext};
use summarize_extract::{Extractor, ExtractorConfig, MarkdownLlm, NoTranscriber};
use summarize_llm::{ContextWindowTable, ModelId, ModelRegistry};
use summarize_run::{Orchestrator, RegistryResolver};
use summarize_slides::{CompositeSource, DirectSource, FfmpegProbe, SlidesLockTable, SlidesPipeline, TesseractOcr, ToolPaths, YtDlpSource};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct BuiltPipeline {
    pub orchestrator: Arc<Orchestrator>,
    pub slides_output_dir: PathBuf,
}

/// Flags from `Cli` that affect how the pipeline itself is constructed
/// (as opposed to a single run's options, which live in `RunOptions`).
pub struct SetupOptions {
    pub config: Config,
    pub timeout: Duration,
    pub no_cache: bool,
    pub no_media_cache: bool,
    pub base_url_flag: Option<String>,
}

fn cache_root() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".summarize")
}

pub fn build_pipeline(opts: SetupOptions) -> Result<BuiltPipeline> {
    let runtime = RuntimeContext::from_process();
    let root = cache_root();

    let content_cache = if opts.no_cache {
        Arc::new(MetadataCache::open_in_memory(0, 0)?)
    } else {
        let path = opts.config.cache.path.clone().unwrap_or_else(|| root.join("cache.sqlite"));
        Arc::new(MetadataCache::open(&path, opts.config.cache.max_mb * 1024 * 1024, opts.config.cache.ttl_days as i64 * 86_400_000)?)
    };
    // The extractor's transcript cache and the orchestrator's summary
    // cache are distinct namespaced tables in the same store (§4.3).
    let transcript_cache = Arc::clone(&content_cache);
    let summary_cache = Arc::clone(&content_cache);

    let media_cache = if opts.no_media_cache {
        Arc::new(MediaCache::open(&std::env::temp_dir().join("summarize-media-disabled"), 1, 0, summarize_core::VerifyMode::None)?)
    } else {
        let path = opts.config.cache.media.path.clone().unwrap_or_else(|| root.join("cache").join("media"));
        Arc::new(MediaCache::open(
            &path,
            opts.config.cache.media.max_mb * 1024 * 1024,
            opts.config.cache.media.ttl_days as i64 * 86_400_000,
            opts.config.cache.media.verify,
        )?)
    };

    let model_registry = Arc::new(ModelRegistry::new(opts.config.clone()));
    let provider_resolver = Arc::new(RegistryResolver { registry: ModelRegistry::new(opts.config.clone()), base_url_flag: opts.base_url_flag.clone() });

    let markdown_llm = resolve_markdown_llm(&opts.config, &model_registry, opts.base_url_flag.as_deref());
    let extractor_config = ExtractorConfig {
        timeout: opts.timeout,
        firecrawl_api_key: std::env::var("FIRECRAWL_API_KEY").ok(),
        apify_token: std::env::var("APIFY_API_TOKEN").ok(),
        markdown_llm,
        transcriber: Arc::new(NoTranscriber),
    };
    let extractor = Arc::new(Extractor::new(transcript_cache, media_cache, extractor_config)?);

    let tools = ToolPaths::from_runtime(&runtime);
    let probe = Arc::new(FfmpegProbe::new(tools.clone(), opts.timeout));
    let source = Arc::new(CompositeSource::new(
        YtDlpSource::new(tools.clone(), opts.timeout),
        DirectSource::new(reqwest::Client::builder().timeout(opts.timeout).build().map_err(|e| Error::Http(e.to_string()))?),
    ));
    let ocr: Option<Arc<dyn summarize_slides::OcrEngine>> = Some(Arc::new(TesseractOcr::from_tool_paths(&tools, opts.timeout)));
    let slides_output_dir = root.join("slides");
    let slides = Some(Arc::new(SlidesPipeline::new(probe, source, ocr)));

    let orchestrator = Arc::new(Orchestrator {
        extractor,
        content_cache,
        summary_cache,
        model_registry,
        provider_resolver,
        context_windows: ContextWindowTable::built_in(),
        slides,
        slides_output_dir: slides_output_dir.clone(),
        slides_locks: Arc::new(SlidesLockTable::new()),
        runtime,
    });

    Ok(BuiltPipeline { orchestrator, slides_output_dir })
}

/// Resolve a provider/model for the HTML-to-Markdown conversion call
/// (§4.4 step 5) the same way a summarization call would: walk the
/// configured default model-or-preset's candidates in order and take the
/// first one a provider can actually be constructed for. Falls back to
/// `None` (degrading to the "no LLM configured" diagnostic already
/// handled in the extractor) when no candidate has usable credentials.
fn resolve_markdown_llm(config: &Config, model_registry: &ModelRegistry, base_url_flag: Option<&str>) -> Option<MarkdownLlm> {
    let candidates = model_registry.candidates(&config.model, RuleContext::Website);
    for candidate in candidates {
        let Some(model_id) = ModelId::parse(&candidate) else { continue };
        if let Some(provider) = model_registry.provider_for(&model_id, base_url_flag) {
            return Some(MarkdownLlm { provider, model: candidate });
        }
    }
    None
}

pub fn load_config(explicit: Option<&std::path::Path>) -> Result<ConfigLoader> {
    ConfigLoader::load(explicit)
}

pub fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}
