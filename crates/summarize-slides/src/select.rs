//! Merge, snap, space, and cap candidate slide timestamps (§4.5 "Uniform
//! fallback" / "Spacing and cap"). Pure functions — no I/O — so the §8
//! invariants on spacing and slide count are directly testable.

/// Minimum gap enforced between raw detected timestamps before merging
/// (§4.5 "Segmentation": `max(0.1, minDuration/2)`).
pub fn dedupe_gap(min_slide_duration: f64) -> f64 {
    (min_slide_duration / 2.0).max(0.1)
}

/// Sort and collapse timestamps closer together than `min_gap`.
pub fn dedupe(mut timestamps: Vec<f64>, min_gap: f64) -> Vec<f64> {
    timestamps.sort_by(f64::total_cmp);
    let mut out: Vec<f64> = Vec::with_capacity(timestamps.len());
    for t in timestamps {
        if out.last().map(|&last| t - last >= min_gap).unwrap_or(true) {
            out.push(t);
        }
    }
    out
}

/// Always-generated interval grid: `min(maxSlides, max(3, round(duration/120)))` points.
pub fn uniform_grid(duration: f64, max_slides: u32) -> Vec<f64> {
    let suggested = (duration / 120.0).round().max(3.0) as u32;
    let n = max_slides.min(suggested).max(1);
    if n == 1 {
        return vec![0.0];
    }
    let interval = duration / n as f64;
    (0..n).map(|i| i as f64 * interval).collect()
}

/// Snap tolerance for merging a uniform grid point with the nearest
/// detected point: `clamp(2, 10, interval·0.35)`.
pub fn snap_tolerance(interval: f64) -> f64 {
    (interval * 0.35).clamp(2.0, 10.0)
}

/// Merge detected cut points with the always-present uniform grid. Each
/// grid point snaps to its nearest detected neighbor when one falls within
/// tolerance (avoiding a near-duplicate pick); otherwise the grid point is
/// kept as-is so coverage never degrades below the uniform baseline.
pub fn merge_with_uniform(detected: &[f64], duration: f64, max_slides: u32) -> Vec<f64> {
    let grid = uniform_grid(duration, max_slides);
    if detected.is_empty() {
        return grid;
    }
    let interval = if grid.len() > 1 { duration / grid.len() as f64 } else { duration };
    let tolerance = snap_tolerance(interval);

    let mut merged = detected.to_vec();
    for point in grid {
        let nearest = detected.iter().min_by(|a, b| (**a - point).abs().partial_cmp(&(**b - point).abs()).unwrap());
        match nearest {
            Some(&d) if (d - point).abs() <= tolerance => {}
            _ => merged.push(point),
        }
    }
    merged
}

/// Enforce `minDuration` spacing and cap the result at `maxSlides`,
/// keeping the earliest picks (§8 invariant 3).
pub fn apply_spacing_and_cap(timestamps: Vec<f64>, min_slide_duration: f64, max_slides: u32) -> Vec<f64> {
    let mut spaced = dedupe(timestamps, min_slide_duration);
    spaced.truncate(max_slides.max(1) as usize);
    spaced
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_collapses_points_closer_than_gap() {
        let out = dedupe(vec![1.0, 1.05, 5.0], 0.5);
        assert_eq!(out, vec![1.0, 5.0]);
    }

    #[test]
    fn uniform_grid_is_bounded_by_max_slides() {
        let grid = uniform_grid(10_000.0, 5);
        assert_eq!(grid.len(), 5);
    }

    #[test]
    fn uniform_grid_never_below_three_points() {
        let grid = uniform_grid(60.0, 20);
        assert!(grid.len() >= 3);
    }

    #[test]
    fn spacing_enforces_min_duration_between_consecutive_picks() {
        let picks = apply_spacing_and_cap(vec![0.0, 1.0, 2.0, 10.0, 20.0], 5.0, 100);
        for window in picks.windows(2) {
            assert!(window[1] - window[0] >= 5.0);
        }
    }

    #[test]
    fn cap_keeps_earliest_picks() {
        let picks = apply_spacing_and_cap(vec![0.0, 10.0, 20.0, 30.0, 40.0], 1.0, 3);
        assert_eq!(picks, vec![0.0, 10.0, 20.0]);
    }

    #[test]
    fn merge_falls_back_to_grid_when_nothing_detected() {
        let merged = merge_with_uniform(&[], 1000.0, 5);
        assert_eq!(merged, uniform_grid(1000.0, 5));
    }

    #[test]
    fn merge_includes_detected_points() {
        let merged = merge_with_uniform(&[42.0], 1000.0, 5);
        assert!(merged.contains(&42.0));
    }
}
