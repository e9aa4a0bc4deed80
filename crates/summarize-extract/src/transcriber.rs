//! Direct-media routing (§4.4 step 2): download through the media cache,
//! then hand the bytes to an injected transcription backend. No concrete
//! transcription vendor is part of this crate's surface — callers inject
//! whichever provider they have credentials for, the same capability-interface
//! shape `summarize-llm::LlmProvider` uses (§9 design notes).

use async_trait::async_trait;
use std::path::Path;
use summarize_core::{Error, Result, TranscriptInfo};

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, path: &Path, media_type: Option<&str>) -> Result<TranscriptInfo>;
}

/// Used when no transcription backend is configured; surfaces the same
/// "unsupported attachment" error shape a provider rejection would (§7).
pub struct NoTranscriber;

#[async_trait]
impl Transcriber for NoTranscriber {
    async fn transcribe(&self, _path: &Path, media_type: Option<&str>) -> Result<TranscriptInfo> {
        Err(Error::AttachmentUnsupported {
            provider: "none-configured".to_string(),
            media_type: media_type.unwrap_or("unknown").to_string(),
        })
    }
}

pub(crate) fn extension_from_url(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.path().rsplit('.').next().map(|s| s.to_string()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_transcriber_reports_unsupported_attachment() {
        let err = NoTranscriber.transcribe(Path::new("/tmp/x.mp3"), Some("audio/mpeg")).await.unwrap_err();
        assert!(matches!(err, Error::AttachmentUnsupported { .. }));
    }

    #[test]
    fn extension_from_url_reads_trailing_path_segment() {
        assert_eq!(extension_from_url("https://a.example/clip.mp3?x=1"), "mp3");
    }
}
