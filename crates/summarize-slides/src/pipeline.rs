//! The full slides pipeline shape (§4.5):
//!
//! ```text
//! prepareDir -> fetchOrStreamSource -> probe -> calibrate -> detect
//!            -> merge/select -> extractFrames -> refineFrames
//!            -> renameSlides -> OCR -> writeManifest
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use summarize_core::{AutoTune, AutoTuneStrategy, Error, Result, Slide, SlideExtractionResult, VideoKind};
use tracing::{debug, info, warn};

use crate::calibrate::{self, CalibrationResult};
use crate::detect;
use crate::hash::AverageHash;
use crate::manifest::{self, SlideSettings};
use crate::ocr::OcrEngine;
use crate::probe::MediaProbe;
use crate::select;
use crate::source::SourceResolver;

/// Phase-weighted progress points from §4.5 "Progress".
mod weight {
    pub const PREPARE: u8 = 2;
    pub const FETCH: u8 = 6;
    pub const DOWNLOAD_END: u8 = 35;
    pub const DETECT_END: u8 = 60;
    pub const EXTRACT_END: u8 = 90;
    pub const REFINE_END: u8 = 96;
    pub const OCR_END: u8 = 99;
    pub const FINALIZE: u8 = 100;
}

pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u8, phase: &str);
}

pub struct NoopProgress;
impl ProgressSink for NoopProgress {
    fn report(&self, _percent: u8, _phase: &str) {}
}

#[derive(Debug, Clone)]
pub struct SlidesConfig {
    /// Scene-detection/frame-extraction fan-out, clamped to `[1, 16]`.
    pub workers: u32,
    /// Calibration sample-frame count request, clamped to `[3, 12]`.
    pub samples: u32,
    /// `None` triggers auto-calibration; `Some` pins an explicit threshold.
    pub scene_threshold: Option<f32>,
    pub max_slides: u32,
    pub min_slide_duration: f64,
    pub ocr_requested: bool,
    pub output_dir: PathBuf,
    pub frame_max_height: u32,
}

impl Default for SlidesConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            samples: 6,
            scene_threshold: None,
            max_slides: 20,
            min_slide_duration: 3.0,
            ocr_requested: false,
            output_dir: PathBuf::from("."),
            frame_max_height: 720,
        }
    }
}

impl SlidesConfig {
    fn effective_workers(&self) -> u32 {
        self.workers.clamp(1, 16)
    }

    fn settings_fingerprint(&self) -> SlideSettings {
        SlideSettings {
            scene_threshold: self.scene_threshold,
            max_slides: self.max_slides,
            min_slide_duration: self.min_slide_duration,
            ocr_requested: self.ocr_requested,
        }
    }
}

pub struct SlidesPipeline {
    probe: Arc<dyn MediaProbe>,
    source: Arc<dyn SourceResolver>,
    ocr: Option<Arc<dyn OcrEngine>>,
}

impl SlidesPipeline {
    pub fn new(probe: Arc<dyn MediaProbe>, source: Arc<dyn SourceResolver>, ocr: Option<Arc<dyn OcrEngine>>) -> Self {
        Self { probe, source, ocr }
    }

    /// Run the full pipeline for one video, reusing a validated cached
    /// manifest when one exists (§4.5 "Cache validation").
    pub async fn extract(
        &self,
        source_url: &str,
        source_kind: VideoKind,
        source_id: &str,
        config: &SlidesConfig,
        progress: &dyn ProgressSink,
    ) -> Result<SlideExtractionResult> {
        progress.report(weight::PREPARE, "prepare");
        let slides_dir = manifest::slides_dir_for(&config.output_dir, source_id);
        let slides_dir_id = manifest::slides_dir_id(&slides_dir);
        std::fs::create_dir_all(&slides_dir)?;

        let settings = config.settings_fingerprint();
        if let Some(cached) = manifest::read_manifest(&slides_dir) {
            if manifest::validate(&cached, source_url, source_kind, source_id, &slides_dir, &slides_dir_id, &settings) {
                info!(source_id, "reusing validated slides manifest");
                progress.report(weight::FINALIZE, "finalize");
                return Ok(cached);
            }
            debug!(source_id, "cached manifest failed validation, re-extracting");
        }

        progress.report(weight::FETCH, "fetch");
        let temp_dir = tempfile::tempdir().map_err(|e| Error::SlideExtraction(format!("failed to create temp dir: {e}")))?;

        // Frame extraction always needs a local, seekable, broadly-decodable
        // file; download it first so a stream-URL failure for detection has
        // an immediate fallback (§4.5 "Source acquisition").
        let downloaded = self.retry_download(source_url, &temp_dir.path().join("download")).await?;
        let extraction_source = downloaded.to_string_lossy().to_string();
        progress.report(weight::DOWNLOAD_END, "download");

        let detection_source = match self.source.stream_url(source_url).await {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "stream URL resolution failed, detecting against the local download instead");
                extraction_source.clone()
            }
        };

        let probe_info = self.probe.probe(&detection_source).await?;
        let duration = probe_info.duration_secs;

        let (threshold, auto_tune) = self.calibrate(&detection_source, duration, config).await?;

        progress.report(weight::DOWNLOAD_END, "detect");
        let detected = match detect::detect_all(self.probe.clone(), &detection_source, duration, config.effective_workers(), threshold).await {
            Ok(points) => points,
            Err(e) => {
                warn!(error = %e, "scene detection failed, falling back to uniform grid only");
                Vec::new()
            }
        };
        let dedupe_gap = select::dedupe_gap(config.min_slide_duration);
        let detected = select::dedupe(detected, dedupe_gap);

        let merged = select::merge_with_uniform(&detected, duration, config.max_slides);
        let selected = select::apply_spacing_and_cap(merged, config.min_slide_duration, config.max_slides);
        progress.report(weight::DETECT_END, "select");

        let mut slides = self.extract_frames(&extraction_source, &selected, &slides_dir, config, progress).await?;
        progress.report(weight::EXTRACT_END, "extract");

        self.refine_frames(&extraction_source, &mut slides, duration, config).await;
        progress.report(weight::REFINE_END, "refine");

        self.rename_slides(&mut slides, &slides_dir)?;

        let mut warnings = Vec::new();
        let ocr_available = self.ocr.is_some();
        if config.ocr_requested {
            if let Some(ocr) = &self.ocr {
                self.run_ocr(ocr.as_ref(), &mut slides, &mut warnings).await;
            } else {
                warnings.push("OCR was requested but no OCR engine is configured".to_string());
            }
        }
        progress.report(weight::OCR_END, "ocr");

        let result = SlideExtractionResult {
            source_url: source_url.to_string(),
            source_kind,
            source_id: source_id.to_string(),
            slides_dir: slides_dir.clone(),
            slides_dir_id,
            scene_threshold: threshold,
            auto_tune,
            max_slides: config.max_slides,
            min_slide_duration: config.min_slide_duration,
            ocr_requested: config.ocr_requested,
            ocr_available,
            slides,
            warnings,
        };
        manifest::write_manifest(&slides_dir, &result)?;
        progress.report(weight::FINALIZE, "finalize");
        Ok(result)
    }

    /// One-time retry on download failure (§4.5 "on-stream failure,
    /// re-download and retry").
    async fn retry_download(&self, source_url: &str, dest_dir: &Path) -> Result<PathBuf> {
        match self.source.download(source_url, dest_dir).await {
            Ok(path) => Ok(path),
            Err(first_error) => {
                warn!(error = %first_error, "source download failed, retrying once");
                self.source.download(source_url, dest_dir).await
            }
        }
    }

    async fn calibrate(&self, source: &str, duration: f64, config: &SlidesConfig) -> Result<(f32, AutoTune)> {
        if let Some(threshold) = config.scene_threshold {
            return Ok((
                threshold,
                AutoTune { enabled: false, chosen_threshold: threshold, confidence: 1.0, strategy: AutoTuneStrategy::None },
            ));
        }

        let n = calibrate::sample_count(config.samples);
        let timestamps = calibrate::sample_timestamps(duration, n);
        let mut hashes = Vec::with_capacity(timestamps.len());
        for ts in timestamps {
            match self.probe.average_hash_at(source, ts).await {
                Ok(h) => hashes.push(h),
                Err(e) => warn!(error = %e, timestamp = ts, "calibration sample failed, skipping"),
            }
        }
        let diffs = diffs_from(&hashes);
        let CalibrationResult { threshold, confidence } = calibrate::calibrate_from_diffs(&diffs);
        Ok((threshold, AutoTune { enabled: true, chosen_threshold: threshold, confidence, strategy: AutoTuneStrategy::Hash }))
    }

    async fn extract_frames(&self, source: &str, timestamps: &[f64], slides_dir: &Path, config: &SlidesConfig, progress: &dyn ProgressSink) -> Result<Vec<Slide>> {
        let total = timestamps.len().max(1);
        let futures = timestamps.iter().enumerate().map(|(i, &timestamp)| {
            let path = slides_dir.join(format!("slide_{:04}_tmp.png", i + 1));
            async move {
                let result = self.probe.extract_frame(source, timestamp, &path, config.frame_max_height).await;
                // One-time retry on a failed extraction (stream hiccup).
                let result = match result {
                    Ok(()) => Ok(()),
                    Err(_) => self.probe.extract_frame(source, timestamp, &path, config.frame_max_height).await,
                };
                result.map(|()| Slide {
                    index: (i + 1) as u32,
                    timestamp,
                    image_path: path,
                    image_version: Some(1),
                    ocr_text: None,
                    ocr_confidence: None,
                })
            }
        });
        let results = futures::future::join_all(futures).await;
        let mut slides = Vec::with_capacity(total);
        for result in results {
            match result {
                Ok(slide) => slides.push(slide),
                Err(e) => warn!(error = %e, "frame extraction failed for a slide, dropping it"),
            }
        }
        // Extraction may complete out-of-order across concurrent
        // futures::join_all entries are already index-ordered, but
        // re-sort defensively by timestamp before the manifest is written.
        slides.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        for (i, slide) in slides.iter_mut().enumerate() {
            slide.index = (i + 1) as u32;
        }
        progress.report(weight::DETECT_END, "extract");
        Ok(slides)
    }

    async fn refine_frames(&self, source: &str, slides: &mut [Slide], duration: f64, config: &SlidesConfig) {
        use crate::refine;
        for slide in slides.iter_mut() {
            let base_stats = match self.probe.frame_stats_at(source, slide.timestamp).await {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, timestamp = slide.timestamp, "could not sample frame stats, skipping refinement");
                    continue;
                }
            };
            if !refine::is_dim(base_stats.brightness, base_stats.contrast, slide.timestamp) {
                continue;
            }
            let base_score = refine::score(base_stats.brightness, base_stats.contrast, 0.0);
            let mut scored = Vec::new();
            for (candidate_ts, delta) in refine::candidate_timestamps(slide.timestamp, duration) {
                if let Ok(stats) = self.probe.frame_stats_at(source, candidate_ts).await {
                    scored.push((candidate_ts, refine::score(stats.brightness, stats.contrast, delta)));
                }
            }
            if let Some(best_ts) = refine::pick_best(base_score, slide.timestamp, &scored) {
                if self.probe.extract_frame(source, best_ts, &slide.image_path, config.frame_max_height).await.is_ok() {
                    slide.timestamp = best_ts;
                    slide.image_version = Some(slide.image_version.unwrap_or(1) + 1);
                } else {
                    warn!(timestamp = best_ts, "refinement candidate selected but re-extraction failed, keeping original frame");
                }
            }
        }
    }

    fn rename_slides(&self, slides: &mut [Slide], slides_dir: &Path) -> Result<()> {
        for slide in slides.iter_mut() {
            let final_name = format!("slide_{:04}_{}s.png", slide.index, slide.timestamp.round() as i64);
            let final_path = slides_dir.join(final_name);
            if slide.image_path != final_path {
                std::fs::rename(&slide.image_path, &final_path)?;
                slide.image_path = final_path;
            }
        }
        Ok(())
    }

    async fn run_ocr(&self, ocr: &dyn OcrEngine, slides: &mut [Slide], warnings: &mut Vec<String>) {
        use crate::ocr::clean_ocr_text;
        let results = futures::future::join_all(slides.iter().map(|slide| async move {
            let raw = ocr.recognize(&slide.image_path).await;
            (slide.index, raw)
        }))
        .await;
        for (index, raw) in results {
            match raw {
                Ok(text) => {
                    let (cleaned, confidence) = clean_ocr_text(&text);
                    if let Some(slide) = slides.iter_mut().find(|s| s.index == index) {
                        slide.ocr_text = Some(cleaned);
                        slide.ocr_confidence = Some(confidence);
                    }
                }
                Err(e) => warnings.push(format!("OCR failed for slide {index}: {e}")),
            }
        }
    }
}

fn diffs_from(hashes: &[AverageHash]) -> Vec<f64> {
    crate::hash::consecutive_diffs(hashes)
}
