//! Media inspection and frame sampling, backed by `ffprobe`/`ffmpeg`
//! subprocesses (§4.5 "probe", "Calibration", "Thumbnail refinement").

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::time::Duration;
use summarize_core::{Error, Result};

use crate::hash::{AverageHash, FRAME_PIXELS, FRAME_SIDE};
use crate::tools::{self, ToolPaths};

#[derive(Debug, Clone, Copy)]
pub struct ProbeInfo {
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct FrameStats {
    pub brightness: f32,
    pub contrast: f32,
}

/// Frame/metadata access abstracted behind a trait so the pipeline's
/// orchestration logic can be exercised with an in-process fake (§10.4) —
/// no real video file or `ffmpeg` binary required in tests.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, source: &str) -> Result<ProbeInfo>;
    async fn average_hash_at(&self, source: &str, timestamp: f64) -> Result<AverageHash>;
    async fn frame_stats_at(&self, source: &str, timestamp: f64) -> Result<FrameStats>;
    /// Scene cuts within `[start, end)` of `source`, at sensitivity
    /// `threshold`. Returned timestamps are relative to `start` (the
    /// segment's own origin), matching the `-ss` seek applied internally.
    async fn detect_cuts(&self, source: &str, start: f64, end: f64, threshold: f32) -> Result<Vec<f64>>;
    async fn extract_frame(&self, source: &str, timestamp: f64, out_path: &Path, max_height: u32) -> Result<()>;
}

static FFPROBE_STREAM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""width"\s*:\s*(\d+).*?"height"\s*:\s*(\d+)"#).unwrap());
static SHOWINFO_PTS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"pts_time:(-?[0-9.]+)").unwrap());

pub struct FfmpegProbe {
    pub tools: ToolPaths,
    pub timeout: Duration,
}

impl FfmpegProbe {
    pub fn new(tools: ToolPaths, timeout: Duration) -> Self {
        Self { tools, timeout }
    }

    async fn sample_gray(&self, source: &str, timestamp: f64, side: u32) -> Result<Vec<u8>> {
        let ts = format!("{timestamp:.3}");
        let side_arg = format!("scale={side}:{side}:flags=bilinear,format=gray");
        let output = tools::run(
            &self.tools.ffmpeg,
            &["-ss", &ts, "-i", source, "-frames:v", "1", "-vf", &side_arg, "-f", "rawvideo", "-"],
            self.timeout,
        )
        .await?;
        if !output.status_ok {
            return Err(Error::SlideExtraction(format!("ffmpeg frame sample failed at {ts}s: {}", output.stderr)));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl MediaProbe for FfmpegProbe {
    async fn probe(&self, source: &str) -> Result<ProbeInfo> {
        let output = tools::run(
            &self.tools.ffprobe,
            &["-v", "error", "-show_entries", "format=duration:stream=width,height", "-of", "json", source],
            self.timeout,
        )
        .await?;
        if !output.status_ok {
            return Err(Error::SlideExtraction(format!("ffprobe failed: {}", output.stderr)));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        let json: serde_json::Value = serde_json::from_str(&text).map_err(|e| Error::SlideExtraction(format!("ffprobe output not JSON: {e}")))?;
        let duration_secs = json["format"]["duration"]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| Error::SlideExtraction("ffprobe did not report a duration".to_string()))?;
        let (width, height) = FFPROBE_STREAM_RE
            .captures(&text)
            .and_then(|c| Some((c.get(1)?.as_str().parse().ok()?, c.get(2)?.as_str().parse().ok()?)))
            .unwrap_or((0, 0));
        Ok(ProbeInfo { duration_secs, width, height })
    }

    async fn average_hash_at(&self, source: &str, timestamp: f64) -> Result<AverageHash> {
        let pixels = self.sample_gray(source, timestamp, FRAME_SIDE as u32).await?;
        if pixels.len() != FRAME_PIXELS {
            return Err(Error::SlideExtraction(format!(
                "expected {FRAME_PIXELS} grayscale bytes, got {}",
                pixels.len()
            )));
        }
        Ok(AverageHash::from_gray_pixels(&pixels))
    }

    async fn frame_stats_at(&self, source: &str, timestamp: f64) -> Result<FrameStats> {
        // Brightness/contrast are derived from a small grayscale sample
        // rather than parsed out of ffmpeg's `signalstats` filter log,
        // keeping this crate free of an output-format dependency: mean
        // pixel value normalized to [0,1] is brightness, normalized
        // standard deviation is contrast.
        let side = 64u32;
        let pixels = self.sample_gray(source, timestamp, side).await?;
        if pixels.is_empty() {
            return Err(Error::SlideExtraction(format!("no frame sampled at {timestamp}s")));
        }
        let n = pixels.len() as f64;
        let mean = pixels.iter().map(|&p| p as f64).sum::<f64>() / n;
        let variance = pixels.iter().map(|&p| (p as f64 - mean).powi(2)).sum::<f64>() / n;
        let stddev = variance.sqrt();
        Ok(FrameStats {
            brightness: (mean / 255.0) as f32,
            contrast: (stddev / 128.0).clamp(0.0, 1.0) as f32,
        })
    }

    async fn detect_cuts(&self, source: &str, start: f64, end: f64, threshold: f32) -> Result<Vec<f64>> {
        let start_arg = format!("{start:.3}");
        let end_arg = format!("{end:.3}");
        let select_arg = format!("select='gt(scene,{threshold})',showinfo");
        let output = tools::run(
            &self.tools.ffmpeg,
            &["-ss", &start_arg, "-to", &end_arg, "-i", source, "-vf", &select_arg, "-f", "null", "-"],
            self.timeout,
        )
        .await?;
        let cuts = SHOWINFO_PTS_RE
            .captures_iter(&output.stderr)
            .filter_map(|c| c.get(1)?.as_str().parse::<f64>().ok())
            .collect();
        Ok(cuts)
    }

    async fn extract_frame(&self, source: &str, timestamp: f64, out_path: &Path, max_height: u32) -> Result<()> {
        let ts = format!("{timestamp:.3}");
        let out = out_path.to_string_lossy();
        let scale_arg = format!("scale=-2:'min({max_height},ih)'");
        let output = tools::run(
            &self.tools.ffmpeg,
            &["-y", "-ss", &ts, "-i", source, "-frames:v", "1", "-vf", &scale_arg, out.as_ref()],
            self.timeout,
        )
        .await?;
        if !output.status_ok {
            return Err(Error::SlideExtraction(format!("ffmpeg frame extraction failed at {ts}s: {}", output.stderr)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn showinfo_pts_regex_extracts_timestamps() {
        let log = "frame=1 pts_time:1.500000 n:0\nframe=2 pts_time:3.250000 n:1";
        let found: Vec<f64> = SHOWINFO_PTS_RE.captures_iter(log).filter_map(|c| c.get(1)?.as_str().parse().ok()).collect();
        assert_eq!(found, vec![1.5, 3.25]);
    }

    #[test]
    fn ffprobe_stream_regex_extracts_dimensions() {
        let json = r#"{"streams":[{"width":1280,"height":720}],"format":{"duration":"12.0"}}"#;
        let caps = FFPROBE_STREAM_RE.captures(json).unwrap();
        assert_eq!(&caps[1], "1280");
        assert_eq!(&caps[2], "720");
    }
}
