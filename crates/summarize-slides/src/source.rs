//! Source acquisition (§4.5 "Source acquisition"): a detectable stream URL
//! for scene-detection, and a broadly-decodable local download for frame
//! extraction. YouTube sources prefer `yt-dlp`'s resolved stream URL for
//! detection so scene-detection never waits on a full download.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use summarize_core::Result;

use crate::tools::{self, ToolPaths};

/// Default `yt-dlp` format selector: H.264/MP4 capped at 720p, the
/// "broadly decodable" format §4.5 asks for.
pub const DEFAULT_YTDLP_FORMAT: &str = "bestvideo[height<=720][ext=mp4]+bestaudio[ext=m4a]/best[height<=720][ext=mp4]/best[height<=720]";

#[async_trait]
pub trait SourceResolver: Send + Sync {
    /// A URL `ffmpeg`/`ffprobe` can read directly without downloading —
    /// used for detection so it can start immediately.
    async fn stream_url(&self, source_url: &str) -> Result<String>;

    /// Download a broadly-decodable local copy into `dest_dir`, returning
    /// its path. Used for frame extraction and as the stream-mode
    /// fallback.
    async fn download(&self, source_url: &str, dest_dir: &Path) -> Result<PathBuf>;
}

pub struct YtDlpSource {
    pub tools: ToolPaths,
    pub format: String,
    pub timeout: Duration,
}

impl YtDlpSource {
    pub fn new(tools: ToolPaths, timeout: Duration) -> Self {
        Self { tools, format: DEFAULT_YTDLP_FORMAT.to_string(), timeout }
    }
}

#[async_trait]
impl SourceResolver for YtDlpSource {
    async fn stream_url(&self, source_url: &str) -> Result<String> {
        let output = tools::run(&self.tools.yt_dlp, &["-g", "-f", &self.format, source_url], self.timeout).await?;
        let url = String::from_utf8_lossy(&output.stdout).lines().next().unwrap_or_default().trim().to_string();
        if !output.status_ok || url.is_empty() {
            return Err(summarize_core::Error::SlideExtraction(format!(
                "yt-dlp could not resolve a stream URL for {source_url}: {}",
                output.stderr
            )));
        }
        Ok(url)
    }

    async fn download(&self, source_url: &str, dest_dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dest_dir).await?;
        let out_template = dest_dir.join("source.%(ext)s");
        let out_arg = out_template.to_string_lossy().to_string();
        let output = tools::run(&self.tools.yt_dlp, &["-f", &self.format, "-o", &out_arg, source_url], self.timeout).await?;
        if !output.status_ok {
            return Err(summarize_core::Error::SlideExtraction(format!("yt-dlp download failed for {source_url}: {}", output.stderr)));
        }
        let mut entries = tokio::fs::read_dir(dest_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.file_stem().and_then(|s| s.to_str()) == Some("source") {
                return Ok(path);
            }
        }
        Err(summarize_core::Error::SlideExtraction(format!("yt-dlp reported success but no output file was found in {}", dest_dir.display())))
    }
}

/// A direct media URL is already a file `ffmpeg` can read; "download" is a
/// no-op that just records the path/URL as both the stream source and, if
/// a local copy is needed, downloads via a plain HTTP GET.
pub struct DirectSource {
    pub client: reqwest::Client,
}

impl DirectSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceResolver for DirectSource {
    async fn stream_url(&self, source_url: &str) -> Result<String> {
        Ok(source_url.to_string())
    }

    async fn download(&self, source_url: &str, dest_dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dest_dir).await?;
        let response = self
            .client
            .get(source_url)
            .send()
            .await
            .map_err(|e| summarize_core::Error::SlideExtraction(format!("download failed: {e}")))?;
        let ext = source_url.rsplit('.').next().filter(|s| s.len() <= 4).unwrap_or("bin");
        let dest = dest_dir.join(format!("source.{ext}"));
        let bytes = response.bytes().await.map_err(|e| summarize_core::Error::SlideExtraction(format!("download body read failed: {e}")))?;
        tokio::fs::write(&dest, &bytes).await?;
        Ok(dest)
    }
}

/// Dispatches to [`YtDlpSource`] for YouTube hosts and [`DirectSource`]
/// for everything else, so one long-lived pipeline instance can serve
/// both source kinds without the caller threading a resolver choice
/// through every call (§4.5, §4.7 step 5).
pub struct CompositeSource {
    pub youtube: YtDlpSource,
    pub direct: DirectSource,
}

impl CompositeSource {
    pub fn new(youtube: YtDlpSource, direct: DirectSource) -> Self {
        Self { youtube, direct }
    }

    fn is_youtube_host(url: &str) -> bool {
        url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
            .map(|host| host.ends_with("youtube.com") || host.ends_with("youtu.be"))
            .unwrap_or(false)
    }
}

#[async_trait]
impl SourceResolver for CompositeSource {
    async fn stream_url(&self, source_url: &str) -> Result<String> {
        if Self::is_youtube_host(source_url) {
            self.youtube.stream_url(source_url).await
        } else {
            self.direct.stream_url(source_url).await
        }
    }

    async fn download(&self, source_url: &str, dest_dir: &Path) -> Result<PathBuf> {
        if Self::is_youtube_host(source_url) {
            self.youtube.download(source_url, dest_dir).await
        } else {
            self.direct.download(source_url, dest_dir).await
        }
    }
}
