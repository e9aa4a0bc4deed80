//! `slides.json` persistence and cache validation (§4.5 "Cache
//! validation"). The manifest *is* `SlideExtractionResult` — every field
//! §4.5 lists as a validation input already lives on that type, so no
//! separate wrapper is needed.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use summarize_core::{Result, SlideExtractionResult, VideoKind};

pub const MANIFEST_FILENAME: &str = "slides.json";

/// The settings subset that participates in `slides_key` and in manifest
/// validation — anything here changing invalidates a cached extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlideSettings {
    pub scene_threshold: Option<f32>,
    pub max_slides: u32,
    pub min_slide_duration: f64,
    pub ocr_requested: bool,
}

/// Atomically write the manifest (temp file + rename), mirroring the
/// media cache's crash-safe index persistence.
pub fn write_manifest(slides_dir: &Path, result: &SlideExtractionResult) -> Result<()> {
    std::fs::create_dir_all(slides_dir)?;
    let path = slides_dir.join(MANIFEST_FILENAME);
    let tmp_path = slides_dir.join(format!("{MANIFEST_FILENAME}.tmp"));
    let json = serde_json::to_vec_pretty(result)?;
    std::fs::write(&tmp_path, &json)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// Read a manifest, tolerating a missing or corrupt file by returning
/// `None` rather than erroring — a validation miss is not exceptional.
pub fn read_manifest(slides_dir: &Path) -> Option<SlideExtractionResult> {
    let path = slides_dir.join(MANIFEST_FILENAME);
    let bytes = std::fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// A manifest is valid iff source identity, directory identity, and
/// settings all match, every `imagePath` resolves inside `slidesDir`, and
/// every image file still exists on disk (§4.5 "Cache validation").
pub fn validate(
    manifest: &SlideExtractionResult,
    source_url: &str,
    source_kind: VideoKind,
    source_id: &str,
    slides_dir: &Path,
    slides_dir_id: &str,
    settings: &SlideSettings,
) -> bool {
    if manifest.source_url != source_url
        || manifest.source_kind != source_kind
        || manifest.source_id != source_id
        || manifest.slides_dir != slides_dir
        || manifest.slides_dir_id != slides_dir_id
    {
        return false;
    }
    let manifest_settings = SlideSettings {
        // An auto-calibrated manifest reconstructs as "no explicit
        // threshold was requested", regardless of what value calibration
        // happened to land on — re-requesting auto mode is still a hit.
        scene_threshold: if manifest.auto_tune.enabled { None } else { Some(manifest.scene_threshold) },
        max_slides: manifest.max_slides,
        min_slide_duration: manifest.min_slide_duration,
        ocr_requested: manifest.ocr_requested,
    };
    if manifest_settings != *settings {
        return false;
    }
    manifest.slides.iter().all(|slide| path_inside(&slide.image_path, slides_dir) && slide.image_path.exists())
}

fn path_inside(path: &Path, dir: &Path) -> bool {
    let Ok(canonical_dir) = dir.canonicalize() else { return false };
    match path.canonicalize() {
        Ok(canonical_path) => canonical_path.starts_with(&canonical_dir),
        Err(_) => false,
    }
}

/// Stable identifier for a slides directory, derived from its own path —
/// used to detect a relocated or reused `outputDir`.
pub fn slides_dir_id(slides_dir: &Path) -> String {
    blake3::hash(slides_dir.to_string_lossy().as_bytes()).to_hex().to_string()
}

pub fn slides_dir_for(output_dir: &Path, source_id: &str) -> PathBuf {
    output_dir.join(source_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use summarize_core::{AutoTune, AutoTuneStrategy, Slide};
    use tempfile::tempdir;

    fn sample_result(slides_dir: PathBuf, slide_path: PathBuf) -> SlideExtractionResult {
        SlideExtractionResult {
            source_url: "https://youtube.com/watch?v=abc".to_string(),
            source_kind: VideoKind::Youtube,
            source_id: "abc".to_string(),
            slides_dir_id: slides_dir_id(&slides_dir),
            slides_dir,
            scene_threshold: 0.1,
            auto_tune: AutoTune { enabled: true, chosen_threshold: 0.1, confidence: 0.5, strategy: AutoTuneStrategy::Hash },
            max_slides: 20,
            min_slide_duration: 3.0,
            ocr_requested: false,
            ocr_available: true,
            slides: vec![Slide { index: 1, timestamp: 1.0, image_path: slide_path, image_version: None, ocr_text: None, ocr_confidence: None }],
            warnings: vec![],
        }
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let slide_path = dir.path().join("slide_0001_1s.png");
        std::fs::write(&slide_path, b"fake png").unwrap();
        let result = sample_result(dir.path().to_path_buf(), slide_path);
        write_manifest(dir.path(), &result).unwrap();
        let loaded = read_manifest(dir.path()).unwrap();
        assert_eq!(loaded.source_id, result.source_id);
        assert_eq!(loaded.slides.len(), 1);
    }

    #[test]
    fn validation_rejects_missing_image_file() {
        let dir = tempdir().unwrap();
        let slide_path = dir.path().join("slide_0001_1s.png");
        // Note: never actually written to disk.
        let result = sample_result(dir.path().to_path_buf(), slide_path);
        let settings = SlideSettings { scene_threshold: None, max_slides: 20, min_slide_duration: 3.0, ocr_requested: false };
        assert!(!validate(&result, &result.source_url, result.source_kind, &result.source_id, dir.path(), &result.slides_dir_id, &settings));
    }

    #[test]
    fn validation_rejects_path_escaping_slides_dir() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        let escaped = outside.path().join("evil.png");
        std::fs::write(&escaped, b"x").unwrap();
        let result = sample_result(dir.path().to_path_buf(), escaped);
        let settings = SlideSettings { scene_threshold: None, max_slides: 20, min_slide_duration: 3.0, ocr_requested: false };
        assert!(!validate(&result, &result.source_url, result.source_kind, &result.source_id, dir.path(), &result.slides_dir_id, &settings));
    }

    #[test]
    fn missing_manifest_file_returns_none() {
        let dir = tempdir().unwrap();
        assert!(read_manifest(dir.path()).is_none());
    }
}
