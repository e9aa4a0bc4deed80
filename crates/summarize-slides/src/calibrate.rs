//! Scene-threshold calibration (§4.5 "Calibration"): sample a handful of
//! frames, hash them, and pick a per-video scene-change threshold from the
//! distribution of consecutive differences.

/// Clamp a requested sample count into the documented `[3, 12]` range.
pub fn sample_count(requested: u32) -> u32 {
    requested.clamp(3, 12)
}

/// `n` timestamps evenly spaced between 5% and 95% of `duration`.
pub fn sample_timestamps(duration: f64, n: u32) -> Vec<f64> {
    let lo = duration * 0.05;
    let hi = duration * 0.95;
    if n <= 1 {
        return vec![lo];
    }
    (0..n).map(|i| lo + (hi - lo) * (i as f64) / ((n - 1) as f64)).collect()
}

/// Linear-interpolated percentile over a sorted copy of `values`.
fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

#[derive(Debug, Clone, Copy)]
pub struct CalibrationResult {
    pub threshold: f32,
    pub confidence: f32,
}

pub const MIN_THRESHOLD: f32 = 0.05;
pub const MAX_THRESHOLD: f32 = 0.30;

/// Derive `{threshold, confidence}` from consecutive average-hash diffs.
///
/// Base threshold is `max(median·0.15, p75·0.20, p90·0.25)`. Very-active
/// content (`p75 ≥ 0.12`) is floored at `0.20` so rapid natural motion
/// doesn't flood detection with spurious cuts; very-static content
/// (`p90 < 0.05`) is capped at `0.08` so subtle cuts stay detectable.
/// Confidence is `clamp(p75/0.25, 0, 1)`.
pub fn calibrate_from_diffs(diffs: &[f64]) -> CalibrationResult {
    if diffs.is_empty() {
        return CalibrationResult { threshold: MIN_THRESHOLD, confidence: 0.0 };
    }
    let median = percentile(diffs, 0.5);
    let p75 = percentile(diffs, 0.75);
    let p90 = percentile(diffs, 0.90);

    let mut base = (median * 0.15).max(p75 * 0.20).max(p90 * 0.25);
    if p75 >= 0.12 {
        base = base.max(0.20);
    }
    if p90 < 0.05 {
        base = base.min(0.08);
    }
    let threshold = (base as f32).clamp(MIN_THRESHOLD, MAX_THRESHOLD);
    let confidence = ((p75 / 0.25) as f32).clamp(0.0, 1.0);
    CalibrationResult { threshold, confidence }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_count_clamps_to_three_twelve() {
        assert_eq!(sample_count(1), 3);
        assert_eq!(sample_count(20), 12);
        assert_eq!(sample_count(6), 6);
    }

    #[test]
    fn sample_timestamps_span_five_to_ninety_five_percent() {
        let ts = sample_timestamps(100.0, 3);
        assert_eq!(ts.first().copied(), Some(5.0));
        assert_eq!(ts.last().copied(), Some(95.0));
    }

    #[test]
    fn threshold_is_clamped_into_documented_range() {
        let result = calibrate_from_diffs(&[0.001, 0.001, 0.001]);
        assert!(result.threshold >= MIN_THRESHOLD);
        let result = calibrate_from_diffs(&[0.9, 0.9, 0.9]);
        assert!(result.threshold <= MAX_THRESHOLD);
    }

    #[test]
    fn very_active_content_floors_threshold_at_point_two() {
        // p75 well above 0.12 triggers the active-content floor.
        let result = calibrate_from_diffs(&[0.15, 0.18, 0.20, 0.22]);
        assert!(result.threshold >= 0.20);
    }

    #[test]
    fn very_static_content_caps_threshold_at_point_zero_eight() {
        let result = calibrate_from_diffs(&[0.01, 0.01, 0.01, 0.02]);
        assert!(result.threshold <= 0.08);
    }

    #[test]
    fn confidence_tracks_p75_scaled_by_quarter() {
        let result = calibrate_from_diffs(&[0.25, 0.25, 0.25]);
        assert!((result.confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_diffs_yield_zero_confidence() {
        let result = calibrate_from_diffs(&[]);
        assert_eq!(result.confidence, 0.0);
    }
}
