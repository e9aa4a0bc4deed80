//! Thumbnail refinement (§4.5 "Thumbnail refinement"): replace a dim
//! frame with a nearby brighter/higher-contrast one if the improvement
//! clears a threshold.

/// Offsets probed on either side of a candidate slide, in seconds.
pub const CANDIDATE_OFFSETS_SECS: [f64; 5] = [2.0, 4.0, 6.0, 8.0, 10.0];

/// Whether `(brightness, contrast)` at `timestamp` qualifies as "dim" and
/// is worth refining. The first slide (within 8s of the start) uses a
/// stricter bar since title cards are often legitimately bright.
pub fn is_dim(brightness: f32, contrast: f32, timestamp: f64) -> bool {
    if timestamp < 8.0 {
        brightness < 0.58 || contrast < 0.2
    } else {
        brightness < 0.24 || contrast < 0.16
    }
}

/// `0.55·brightness + 0.45·contrast − 0.05·|Δ|/10`.
pub fn score(brightness: f32, contrast: f32, delta_secs: f64) -> f32 {
    0.55 * brightness + 0.45 * contrast - 0.05 * (delta_secs.abs() / 10.0) as f32
}

/// Minimum score improvement required to accept a refined candidate.
pub fn improvement_threshold(timestamp: f64) -> f32 {
    if timestamp < 8.0 { 0.015 } else { 0.03 }
}

/// All in-bounds candidate timestamps to probe around `timestamp`, paired
/// with their signed offset (used for the score's `|Δ|` penalty).
pub fn candidate_timestamps(timestamp: f64, duration: f64) -> Vec<(f64, f64)> {
    let mut out = Vec::with_capacity(CANDIDATE_OFFSETS_SECS.len() * 2);
    for &offset in &CANDIDATE_OFFSETS_SECS {
        for &sign in &[1.0, -1.0] {
            let candidate = timestamp + sign * offset;
            if candidate >= 0.0 && candidate <= duration {
                out.push((candidate, sign * offset));
            }
        }
    }
    out
}

/// Pick the best-scoring candidate stat, if any clears the improvement
/// threshold over the base frame.
pub fn pick_best(base_score: f32, timestamp: f64, candidates: &[(f64, f32)]) -> Option<f64> {
    let threshold = improvement_threshold(timestamp);
    candidates
        .iter()
        .filter(|(_, s)| s - base_score >= threshold)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .map(|(ts, _)| *ts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bright_high_contrast_frame_is_not_dim() {
        assert!(!is_dim(0.7, 0.5, 100.0));
    }

    #[test]
    fn dark_frame_past_first_slide_window_is_dim() {
        assert!(is_dim(0.1, 0.5, 100.0));
    }

    #[test]
    fn first_slide_uses_stricter_bar() {
        assert!(is_dim(0.5, 0.5, 2.0));
        assert!(!is_dim(0.7, 0.5, 2.0));
    }

    #[test]
    fn candidate_timestamps_excludes_out_of_range_offsets() {
        let candidates = candidate_timestamps(3.0, 100.0);
        assert!(candidates.iter().all(|(ts, _)| *ts >= 0.0 && *ts <= 100.0));
        assert!(candidates.iter().any(|(ts, _)| *ts < 3.0));
    }

    #[test]
    fn pick_best_requires_clearing_improvement_threshold() {
        let base = score(0.1, 0.1, 0.0);
        let candidates = vec![(5.0, base + 0.01), (7.0, base + 0.05)];
        assert_eq!(pick_best(base, 100.0, &candidates), Some(7.0));
    }

    #[test]
    fn pick_best_returns_none_when_nothing_improves_enough() {
        let base = score(0.5, 0.5, 0.0);
        let candidates = vec![(5.0, base + 0.001)];
        assert_eq!(pick_best(base, 100.0, &candidates), None);
    }
}
