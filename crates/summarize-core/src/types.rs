use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{Error, Result};

/// Unique identifier for a daemon-side run.
pub type RunId = uuid::Uuid;

/// Monotonic constant participating in every cache key. Bumping this
/// invalidates every previously cached transcript/content/summary/slide
/// entry in one move, without touching the store's schema.
pub const FORMAT_VERSION: u32 = 1;

/// A tagged union over the two ways a run can be given work: a remote URL
/// or a local/remote file path already resolved by the front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InputTarget {
    Url { payload: String },
    File { payload: PathBuf },
}

impl InputTarget {
    /// Parse a raw CLI/daemon-supplied string into an `InputTarget`.
    ///
    /// A bare `http(s)://` or `file://` prefix is accepted directly. Other
    /// schemes are rejected *unless* an `http(s)://` substring can be found
    /// later in the string — the last occurrence wins, mirroring how a
    /// pasted "open in browser" link sometimes carries a tracking-redirect
    /// prefix ahead of the real URL.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Ok(InputTarget::Url {
                payload: trimmed.to_string(),
            });
        }
        if let Some(rest) = trimmed.strip_prefix("file://") {
            return Ok(InputTarget::File {
                payload: PathBuf::from(rest),
            });
        }
        if let Some(idx) = trimmed.rfind("https://").or_else(|| trimmed.rfind("http://")) {
            return Ok(InputTarget::Url {
                payload: trimmed[idx..].to_string(),
            });
        }
        let path = PathBuf::from(trimmed);
        if path.exists() {
            return Ok(InputTarget::File { payload: path });
        }
        Err(Error::InputValidation(format!(
            "'{trimmed}' is neither an http(s) URL, a file:// URL, nor an existing file path"
        )))
    }
}

/// Whether a URL looks like an HTML document ("website") or a downloadable
/// binary asset. Decided first by pathname-extension heuristic, then
/// refined once the first response bytes arrive (an HTML sniff on an
/// "asset"-classified URL is a classification error, not a silent demotion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlKind {
    Website,
    Asset,
}

const ASSET_EXTENSIONS: &[&str] = &[
    "mp3", "mp4", "m4a", "wav", "flac", "ogg", "webm", "mov", "avi", "mkv", "pdf", "zip",
];

impl UrlKind {
    pub fn classify(url: &str) -> Self {
        let path = url::Url::parse(url)
            .map(|u| u.path().to_ascii_lowercase())
            .unwrap_or_else(|_| url.to_ascii_lowercase());
        match path.rsplit('.').next() {
            Some(ext) if ASSET_EXTENSIONS.contains(&ext) => UrlKind::Asset,
            _ => UrlKind::Website,
        }
    }
}

/// The kind of embedded video a page may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoKind {
    Youtube,
    Direct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRef {
    pub kind: VideoKind,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptInfo {
    pub source: String,
    pub chars: usize,
    pub word_count: usize,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// The normalized result of running the extractor pipeline to completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedContent {
    /// Final, post-redirect URL — never the caller's original input.
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub site_name: Option<String>,
    pub content: String,
    pub truncated: bool,
    pub total_characters: usize,
    pub word_count: usize,
    pub transcript: Option<TranscriptInfo>,
    pub video: Option<VideoRef>,
    pub is_video_only: bool,
    pub diagnostics: Vec<String>,
}

impl ExtractedContent {
    /// Normalized form used for summary-cache keying: collapse whitespace
    /// runs to single spaces and trim. Two extractions of different URLs
    /// whose articles are byte-identical after this normalization share a
    /// cached summary.
    pub fn normalized_content(&self) -> String {
        self.content.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Strategy knobs that participate in the content-cache key; anything not
/// listed here is deliberately excluded from the key so adding unrelated
/// fields never invalidates the cache.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExtractSettings {
    pub firecrawl: FirecrawlMode,
    pub markdown: MarkdownMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FirecrawlMode {
    Off,
    #[default]
    Auto,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MarkdownMode {
    #[default]
    Off,
    Auto,
    Llm,
}

/// `{tag,label}` pair produced by the language resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLanguage {
    pub tag: String,
    pub label: String,
}

/// File-backed media cache entry. `file_name` is derived from `hash(url)`
/// plus the inferred extension and is never accepted from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaCacheEntry {
    pub url: String,
    pub file_name: String,
    pub size_bytes: u64,
    pub sha256: Option<String>,
    pub media_type: Option<String>,
    pub filename: Option<String>,
    pub created_at_ms: i64,
    pub last_access_at_ms: i64,
    pub expires_at_ms: Option<i64>,
}

/// Verification mode applied on `MediaCache::get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMode {
    Size,
    Hash,
    #[default]
    None,
}

/// One detected/selected slide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slide {
    pub index: u32,
    pub timestamp: f64,
    pub image_path: PathBuf,
    pub image_version: Option<u32>,
    pub ocr_text: Option<String>,
    pub ocr_confidence: Option<f32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AutoTune {
    pub enabled: bool,
    pub chosen_threshold: f32,
    pub confidence: f32,
    pub strategy: AutoTuneStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoTuneStrategy {
    Hash,
    None,
}

/// The full, immutable-after-write result of one slides extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideExtractionResult {
    pub source_url: String,
    pub source_kind: VideoKind,
    pub source_id: String,
    pub slides_dir: PathBuf,
    pub slides_dir_id: String,
    pub scene_threshold: f32,
    pub auto_tune: AutoTune,
    pub max_slides: u32,
    pub min_slide_duration: f64,
    pub ocr_requested: bool,
    pub ocr_available: bool,
    pub slides: Vec<Slide>,
    pub warnings: Vec<String>,
}

/// Run lifecycle state. Transitions are monotonic: Queued -> Running ->
/// (Done | Failed); no state is ever revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Queued,
    Running,
    Done,
    Failed,
}

/// Daemon-side run record (§3, §4.6, §4.8): the object a `POST
/// /v1/summarize` call creates and `GET /v1/summarize/{id}/events`
/// subscribes to. `events` is append-only and replay-addressable —
/// late subscribers get the log so far, then join the live tail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub url: String,
    pub state: RunState,
    pub created_at_ms: i64,
    pub events: Vec<crate::SseEvent>,
}

impl Run {
    pub fn new(id: RunId, url: String, created_at_ms: i64) -> Self {
        Self { id, url, state: RunState::Queued, created_at_ms, events: Vec::new() }
    }
}

/// The purpose an individual LLM call served within a run, used to group
/// CostBook rows and to decide chunking strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallPurpose {
    Summary,
    ChunkNotes,
    Markdown,
    AssetSummary,
}

/// Token usage for one LLM call. Any field may be `None` when a provider
/// doesn't report it — CostBook aggregation must preserve that absence
/// rather than treat it as zero.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt: Option<u64>,
    pub completion: Option<u64>,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCall {
    pub provider: String,
    pub model: String,
    pub usage: Usage,
    pub purpose: CallPurpose,
}

/// Target summary length, selected via `--length` or the daemon's
/// `length` request field. `target_chars` is a guideline by default; the
/// design notes' "hard limit" reading applies only when the caller
/// supplies an explicit `maxCharacters` override, which takes precedence
/// over this table (§9 open questions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
    Xl,
    Xxl,
}

impl SummaryLength {
    /// Approximate prose-length guideline in characters, used to size the
    /// summary prompt's target-length instruction.
    pub fn target_chars(&self) -> u32 {
        match self {
            SummaryLength::Short => 500,
            SummaryLength::Medium => 1500,
            SummaryLength::Long => 3500,
            SummaryLength::Xl => 7000,
            SummaryLength::Xxl => 14000,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "short" => Some(SummaryLength::Short),
            "medium" => Some(SummaryLength::Medium),
            "long" => Some(SummaryLength::Long),
            "xl" => Some(SummaryLength::Xl),
            "xxl" => Some(SummaryLength::Xxl),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryLength::Short => "short",
            SummaryLength::Medium => "medium",
            SummaryLength::Long => "long",
            SummaryLength::Xl => "xl",
            SummaryLength::Xxl => "xxl",
        }
    }
}

/// Per-1M-token USD pricing for one model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelPrice {
    pub input_usd_per_1m: f64,
    pub output_usd_per_1m: f64,
}
