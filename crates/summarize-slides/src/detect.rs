//! Segmented, parallel scene detection (§4.5 "Segmentation").

use std::sync::Arc;
use summarize_core::Result;

use crate::probe::MediaProbe;

/// Split `[0, duration)` into `n ≤ max_workers` chunks, none shorter than
/// one minute.
pub fn segment_ranges(duration: f64, max_workers: u32) -> Vec<(f64, f64)> {
    const MIN_CHUNK_SECS: f64 = 60.0;
    if duration <= 0.0 {
        return vec![(0.0, 0.0)];
    }
    let by_duration = (duration / MIN_CHUNK_SECS).floor() as u32;
    let n = by_duration.clamp(1, max_workers.max(1));
    let chunk_len = duration / n as f64;
    (0..n)
        .map(|i| {
            let start = i as f64 * chunk_len;
            let end = if i == n - 1 { duration } else { (i + 1) as f64 * chunk_len };
            (start, end)
        })
        .collect()
}

/// Detect cuts within one segment, retrying once at half the threshold if
/// nothing is found (§4.5: "retry once with halved threshold if 0
/// detections"). Returned timestamps are adjusted back into the whole
/// video's timeline.
pub async fn detect_segment(probe: &dyn MediaProbe, source: &str, start: f64, end: f64, threshold: f32) -> Result<Vec<f64>> {
    let mut cuts = probe.detect_cuts(source, start, end, threshold).await?;
    if cuts.is_empty() {
        let halved = (threshold / 2.0).max(0.01);
        cuts = probe.detect_cuts(source, start, end, halved).await?;
    }
    Ok(cuts.into_iter().map(|t| t + start).collect())
}

/// Run detection across every segment concurrently and flatten the
/// results (still unsorted/unmerged — that's `select::dedupe`'s job).
pub async fn detect_all(probe: Arc<dyn MediaProbe>, source: &str, duration: f64, max_workers: u32, threshold: f32) -> Result<Vec<f64>> {
    let ranges = segment_ranges(duration, max_workers);
    let futures = ranges.into_iter().map(|(start, end)| {
        let probe = probe.clone();
        let source = source.to_string();
        async move { detect_segment(probe.as_ref(), &source, start, end, threshold).await }
    });
    let results = futures::future::join_all(futures).await;
    let mut all = Vec::new();
    for result in results {
        all.extend(result?);
    }
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_ranges_respects_min_chunk_length() {
        let ranges = segment_ranges(90.0, 8);
        assert_eq!(ranges.len(), 1);
    }

    #[test]
    fn segment_ranges_caps_at_max_workers() {
        let ranges = segment_ranges(10_000.0, 4);
        assert_eq!(ranges.len(), 4);
    }

    #[test]
    fn segment_ranges_cover_full_duration_contiguously() {
        let ranges = segment_ranges(600.0, 8);
        assert_eq!(ranges.first().unwrap().0, 0.0);
        assert_eq!(ranges.last().unwrap().1, 600.0);
        for window in ranges.windows(2) {
            assert_eq!(window[0].1, window[1].0);
        }
    }
}
