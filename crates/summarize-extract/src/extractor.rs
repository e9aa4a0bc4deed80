//! Extractor pipeline entry point (§4.4). One `extract` call runs the
//! strategy order end to end for a single URL; video-only recursion is the
//! orchestrator's job (summarize-run, §4.7 step 4) — this crate only
//! reports `is_video_only` and the embedded `VideoRef`.

use std::sync::Arc;
use std::time::Duration;
use summarize_cache::{MediaCache, MetadataCache, Namespace};
use summarize_core::{
    Error, ExtractSettings, ExtractedContent, FirecrawlMode, MarkdownMode, Result, TranscriptInfo, UrlKind, VideoKind,
};
use summarize_llm::LlmProvider;
use tracing::{debug, info, warn};

use crate::transcriber::{Transcriber, extension_from_url};
use crate::{firecrawl, html, markdown, youtube};

/// Model used for the optional HTML-to-Markdown conversion call, kept
/// separate from the summary model so callers can point it at something
/// cheap.
pub struct MarkdownLlm {
    pub provider: Arc<dyn LlmProvider>,
    pub model: String,
}

pub struct ExtractorConfig {
    pub timeout: Duration,
    pub firecrawl_api_key: Option<String>,
    pub apify_token: Option<String>,
    pub markdown_llm: Option<MarkdownLlm>,
    pub transcriber: Arc<dyn Transcriber>,
}

pub struct Extractor {
    client: reqwest::Client,
    transcript_cache: Arc<MetadataCache>,
    media_cache: Arc<MediaCache>,
    config: ExtractorConfig,
}

impl Extractor {
    pub fn new(transcript_cache: Arc<MetadataCache>, media_cache: Arc<MediaCache>, config: ExtractorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self { client, transcript_cache, media_cache, config })
    }

    /// The media cache backing this extractor's video/audio downloads,
    /// for front-ends that report or clear cache occupancy (`--cache-stats`,
    /// `--clear-cache`, §6).
    pub fn media_cache(&self) -> &Arc<MediaCache> {
        &self.media_cache
    }

    /// Run the full strategy order for one URL (§4.4). Individual strategy
    /// failures are attached as diagnostics rather than propagated, except
    /// when every strategy for the branch taken has been exhausted.
    pub async fn extract(&self, url: &str, settings: &ExtractSettings) -> Result<ExtractedContent> {
        if youtube::is_youtube_url(url) {
            return self.extract_youtube(url).await;
        }
        match UrlKind::classify(url) {
            UrlKind::Asset => self.extract_media(url).await,
            UrlKind::Website => self.extract_website(url, settings).await,
        }
    }

    async fn extract_youtube(&self, url: &str) -> Result<ExtractedContent> {
        let video_id = youtube::extract_video_id(url)
            .ok_or_else(|| Error::Extraction(format!("could not find a video id in {url}")))?;
        let namespace = "yt:transcript";
        let key = summarize_cache::transcript_key(url, namespace, None);

        if let Some(cached) = self.transcript_cache.get(Namespace::Transcript, &key)? {
            if let Ok(info) = serde_json::from_value::<TranscriptInfo>(cached) {
                debug!(video_id, "transcript cache hit");
                return Ok(self.youtube_content(url, &video_id, info, Vec::new()));
            }
        }

        let info = youtube::fetch_transcript(&self.client, &video_id, self.config.apify_token.as_deref()).await?;
        self.transcript_cache.put(Namespace::Transcript, &key, &serde_json::to_value(&info)?)?;
        Ok(self.youtube_content(url, &video_id, info, Vec::new()))
    }

    fn youtube_content(&self, url: &str, video_id: &str, info: TranscriptInfo, diagnostics: Vec<String>) -> ExtractedContent {
        let text = info.metadata["text"].as_str().unwrap_or_default().to_string();
        ExtractedContent {
            url: youtube::watch_url(video_id),
            title: format!("YouTube video {video_id}"),
            description: None,
            site_name: Some("YouTube".to_string()),
            total_characters: text.chars().count(),
            word_count: text.split_whitespace().count(),
            content: text,
            truncated: false,
            transcript: Some(info),
            video: Some(summarize_core::VideoRef { kind: VideoKind::Youtube, url: url.to_string() }),
            is_video_only: false,
            diagnostics,
        }
    }

    async fn extract_media(&self, url: &str) -> Result<ExtractedContent> {
        let mut diagnostics = Vec::new();
        let (entry, path) = if let Some(hit) = self.media_cache.get(url)? {
            hit
        } else {
            let resp = self.client.get(url).send().await.map_err(|e| Error::Http(e.to_string()))?;
            if !resp.status().is_success() {
                return Err(Error::Extraction(format!("downloading {url} returned status {}", resp.status())));
            }
            let media_type = resp.headers().get(reqwest::header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(|s| s.to_string());
            let bytes = resp.bytes().await.map_err(|e| Error::Http(e.to_string()))?;
            let extension = extension_from_url(url);
            self.media_cache.put(url, &bytes, &extension, media_type, None, None)?
        };

        let transcript = self.config.transcriber.transcribe(&path, entry.media_type.as_deref()).await;
        let info = match transcript {
            Ok(info) => info,
            Err(e) => {
                warn!(url, error = %e, "direct media transcription failed");
                return Err(e);
            }
        };
        let text = info.metadata["text"].as_str().unwrap_or_default().to_string();
        if text.trim().is_empty() {
            diagnostics.push("transcription returned empty text".to_string());
        }

        Ok(ExtractedContent {
            url: url.to_string(),
            title: entry.filename.clone().unwrap_or_else(|| url.to_string()),
            description: None,
            site_name: None,
            total_characters: text.chars().count(),
            word_count: text.split_whitespace().count(),
            content: text,
            truncated: false,
            transcript: Some(info),
            video: None,
            is_video_only: false,
            diagnostics,
        })
    }

    async fn extract_website(&self, url: &str, settings: &ExtractSettings) -> Result<ExtractedContent> {
        let mut diagnostics = Vec::new();
        let page = html::fetch(&self.client, url).await?;

        let mut article = html::extract_article(&page.html);
        let mut used_firecrawl = false;

        let should_try_firecrawl_upfront = settings.firecrawl == FirecrawlMode::Always;
        if should_try_firecrawl_upfront {
            if let Some(key) = &self.config.firecrawl_api_key {
                match firecrawl::scrape(&self.client, key, url).await {
                    Ok(result) => {
                        article.text = result.markdown;
                        if let Some(title) = result.title {
                            article.title = title;
                        }
                        used_firecrawl = true;
                    }
                    Err(e) => {
                        diagnostics.push(format!("firecrawl scrape failed: {e}"));
                    }
                }
            } else {
                diagnostics.push("firecrawl=always requested but no FIRECRAWL_API_KEY configured".to_string());
            }
        }

        if !used_firecrawl && settings.firecrawl == FirecrawlMode::Auto && html::looks_too_thin(&article.text) {
            if let Some(key) = &self.config.firecrawl_api_key {
                info!(url, "raw extraction looked thin, falling back to firecrawl");
                match firecrawl::scrape(&self.client, key, url).await {
                    Ok(result) => {
                        article.text = result.markdown;
                        if let Some(title) = result.title {
                            article.title = title;
                        }
                        used_firecrawl = true;
                    }
                    Err(e) => diagnostics.push(format!("firecrawl fallback failed: {e}")),
                }
            }
        }

        let mut is_video_only = false;
        let mut video = None;
        if html::looks_too_thin(&article.text) {
            if let Some(embedded) = html::find_embedded_youtube(&page.html) {
                is_video_only = true;
                video = Some(embedded);
            } else {
                diagnostics.push("extraction yielded too little text and no fallback succeeded".to_string());
            }
        }

        let should_convert_markdown = match settings.markdown {
            MarkdownMode::Llm => true,
            MarkdownMode::Auto => !used_firecrawl && html::looks_too_thin(&article.text),
            MarkdownMode::Off => false,
        };
        if should_convert_markdown && !is_video_only {
            if let Some(llm) = &self.config.markdown_llm {
                match markdown::convert(llm.provider.as_ref(), &llm.model, &page.html).await {
                    Ok(converted) if !converted.trim().is_empty() => article.text = converted,
                    Ok(_) => diagnostics.push("markdown conversion returned empty output".to_string()),
                    Err(e) => diagnostics.push(format!("markdown conversion failed: {e}")),
                }
            } else {
                diagnostics.push("markdown mode requested but no LLM configured for conversion".to_string());
            }
        }

        let content = if is_video_only { String::new() } else { article.text };

        Ok(ExtractedContent {
            url: page.final_url,
            title: article.title,
            description: article.description,
            site_name: article.site_name,
            total_characters: content.chars().count(),
            word_count: content.split_whitespace().count(),
            content,
            truncated: false,
            transcript: None,
            video,
            is_video_only,
            diagnostics,
        })
    }
}
