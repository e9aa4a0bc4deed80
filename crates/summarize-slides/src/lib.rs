//! Slide-extraction pipeline (§4.5): turns a video into a directory of
//! per-scene PNG frames plus an optional per-slide OCR transcript, behind
//! a per-source-directory lock and a validated on-disk manifest cache.

pub mod calibrate;
pub mod detect;
pub mod hash;
pub mod ids;
pub mod lock;
pub mod manifest;
pub mod ocr;
pub mod pipeline;
pub mod probe;
pub mod refine;
pub mod select;
pub mod source;
pub mod tools;

pub use lock::SlidesLockTable;
pub use manifest::SlideSettings;
pub use ocr::{OcrEngine, TesseractOcr};
pub use pipeline::{NoopProgress, ProgressSink, SlidesConfig, SlidesPipeline};
pub use probe::{FfmpegProbe, FrameStats, MediaProbe, ProbeInfo};
pub use source::{CompositeSource, DirectSource, SourceResolver, YtDlpSource};

#[cfg(test)]
mod integration_tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use summarize_core::{Result, VideoKind};
    use tempfile::tempdir;

    struct FakeProbe {
        duration: f64,
    }

    #[async_trait]
    impl MediaProbe for FakeProbe {
        async fn probe(&self, _source: &str) -> Result<ProbeInfo> {
            Ok(ProbeInfo { duration_secs: self.duration, width: 1280, height: 720 })
        }

        async fn average_hash_at(&self, _source: &str, timestamp: f64) -> Result<hash::AverageHash> {
            // Deterministic per-timestamp pattern so calibration sees some variation.
            let value = ((timestamp as u32) % 256) as u8;
            Ok(hash::AverageHash::from_gray_pixels(&vec![value; hash::FRAME_PIXELS]))
        }

        async fn frame_stats_at(&self, _source: &str, _timestamp: f64) -> Result<FrameStats> {
            Ok(FrameStats { brightness: 0.6, contrast: 0.5 })
        }

        async fn detect_cuts(&self, _source: &str, start: f64, end: f64, _threshold: f32) -> Result<Vec<f64>> {
            // One cut roughly mid-segment.
            Ok(vec![((end - start) / 2.0).max(0.0)])
        }

        async fn extract_frame(&self, _source: &str, _timestamp: f64, out_path: &Path, _max_height: u32) -> Result<()> {
            std::fs::write(out_path, b"fake-png")?;
            Ok(())
        }
    }

    struct FakeSource {
        download_path: Arc<Mutex<Option<PathBuf>>>,
    }

    #[async_trait]
    impl SourceResolver for FakeSource {
        async fn stream_url(&self, source_url: &str) -> Result<String> {
            Ok(source_url.to_string())
        }

        async fn download(&self, source_url: &str, dest_dir: &Path) -> Result<PathBuf> {
            std::fs::create_dir_all(dest_dir)?;
            let path = dest_dir.join("source.mp4");
            std::fs::write(&path, b"fake-video")?;
            *self.download_path.lock() = Some(path.clone());
            let _ = source_url;
            Ok(path)
        }
    }

    #[tokio::test]
    async fn end_to_end_extraction_produces_a_validated_manifest() {
        let output_dir = tempdir().unwrap();
        let probe = Arc::new(FakeProbe { duration: 600.0 });
        let source = Arc::new(FakeSource { download_path: Arc::new(Mutex::new(None)) });
        let pipeline = SlidesPipeline::new(probe, source, None);

        let config = SlidesConfig { output_dir: output_dir.path().to_path_buf(), ..Default::default() };
        let result = pipeline
            .extract("https://youtube.com/watch?v=abc123", VideoKind::Youtube, "abc123", &config, &NoopProgress)
            .await
            .unwrap();

        assert!(!result.slides.is_empty());
        for slide in &result.slides {
            assert!(slide.image_path.starts_with(&result.slides_dir));
            assert!(slide.image_path.exists());
        }
        for window in result.slides.windows(2) {
            assert!(window[1].timestamp - window[0].timestamp >= config.min_slide_duration);
        }
        assert!(manifest::read_manifest(&result.slides_dir).is_some());
    }

    #[tokio::test]
    async fn second_extraction_reuses_cached_manifest() {
        let output_dir = tempdir().unwrap();
        let probe = Arc::new(FakeProbe { duration: 300.0 });
        let source = Arc::new(FakeSource { download_path: Arc::new(Mutex::new(None)) });
        let pipeline = SlidesPipeline::new(probe, source, None);
        let config = SlidesConfig { output_dir: output_dir.path().to_path_buf(), ..Default::default() };

        let first = pipeline.extract("https://youtube.com/watch?v=xyz", VideoKind::Youtube, "xyz", &config, &NoopProgress).await.unwrap();
        let second = pipeline.extract("https://youtube.com/watch?v=xyz", VideoKind::Youtube, "xyz", &config, &NoopProgress).await.unwrap();

        assert_eq!(first.slides.len(), second.slides.len());
        assert_eq!(first.slides_dir_id, second.slides_dir_id);
    }
}
