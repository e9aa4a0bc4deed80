//! Refresh-free model ranker (§4.9): given an OpenRouter catalog
//! response, narrow it to viable `:free` candidates and probe the
//! survivors, backing off on rate limits.

use std::time::Duration;
use summarize_core::{Error, Result};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct FreeCandidate {
    pub id: String,
    pub param_count_billion: Option<f64>,
    pub created_unix: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct RankerOptions {
    pub min_params_billion: f64,
    pub max_age_days: u32,
    pub runs: u32,
}

impl Default for RankerOptions {
    fn default() -> Self {
        Self { min_params_billion: 27.0, max_age_days: 180, runs: 1 }
    }
}

/// Extract `:free`-suffixed models from a raw OpenRouter `/models` catalog
/// response, parsing parameter counts heuristically from the model name
/// (`"...-70b..."`, `"...-8x7b..."`, …).
pub fn parse_catalog(catalog: &serde_json::Value, now_unix: i64, opts: &RankerOptions) -> Vec<FreeCandidate> {
    let Some(models) = catalog["data"].as_array() else { return Vec::new() };
    let max_age_secs = if opts.max_age_days == 0 { i64::MAX } else { opts.max_age_days as i64 * 86_400 };

    let mut candidates: Vec<FreeCandidate> = models
        .iter()
        .filter_map(|m| {
            let id = m["id"].as_str()?;
            if !id.ends_with(":free") {
                return None;
            }
            let created = m["created"].as_i64().unwrap_or(0);
            let param_count = parse_param_count_billion(id);
            Some(FreeCandidate { id: id.to_string(), param_count_billion: param_count, created_unix: created })
        })
        .filter(|c| c.param_count_billion.map(|p| p >= opts.min_params_billion).unwrap_or(false))
        .filter(|c| opts.max_age_days == 0 || now_unix - c.created_unix <= max_age_secs)
        .collect();

    candidates.sort_by(|a, b| b.created_unix.cmp(&a.created_unix));
    candidates.truncate(10);
    candidates
}

/// Parse a parameter count like `70b`, `8x7b` (mixture — total is product),
/// or `3.5b` out of a model id's trailing segment. Returns `None` when no
/// recognizable pattern is present.
fn parse_param_count_billion(id: &str) -> Option<f64> {
    let lower = id.to_lowercase();
    for segment in lower.split(['-', '/', ':']) {
        if let Some(stripped) = segment.strip_suffix('b') {
            if let Some((experts, each)) = stripped.split_once('x') {
                let experts: f64 = experts.parse().ok()?;
                let each: f64 = each.parse().ok()?;
                return Some(experts * each);
            }
            if let Ok(n) = stripped.parse::<f64>() {
                return Some(n);
            }
        }
    }
    None
}

pub trait FreeModelProbe {
    /// Run one probe call against `model_id`, returning `Ok(true)` for a
    /// usable non-empty response, `Ok(false)` for an empty/garbage one,
    /// and `Err` for a hard failure (propagates rate-limit info via
    /// `Error::RateLimited`).
    fn probe(&self, model_id: &str) -> Result<bool>;
}

/// Run `1 + opts.runs` probes per candidate (in order), stopping at the
/// first candidate whose probes all succeed. Backs off at least 60s on a
/// rate-limited probe and retries that candidate once before moving on.
pub async fn rank<P: FreeModelProbe>(
    candidates: &[FreeCandidate],
    opts: &RankerOptions,
    probe: &P,
    verbose: bool,
) -> Option<String> {
    let total_runs = 1 + opts.runs;
    'candidate: for candidate in candidates {
        let mut backed_off_once = false;
        let mut runs_done = 0;
        while runs_done < total_runs {
            match probe.probe(&candidate.id) {
                Ok(true) => {
                    runs_done += 1;
                }
                Ok(false) => {
                    continue 'candidate;
                }
                Err(Error::RateLimited { retry_after_secs }) if !backed_off_once => {
                    let wait = retry_after_secs.max(60);
                    if verbose {
                        info!(model = %candidate.id, wait_secs = wait, "rate limited, backing off");
                    }
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                    backed_off_once = true;
                }
                Err(e) => {
                    warn!(model = %candidate.id, error = %e, "probe failed");
                    continue 'candidate;
                }
            }
        }
        return Some(candidate.id.clone());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(entries: &[(&str, i64)]) -> serde_json::Value {
        serde_json::json!({
            "data": entries.iter().map(|(id, created)| serde_json::json!({"id": id, "created": created})).collect::<Vec<_>>()
        })
    }

    #[test]
    fn filters_to_free_suffix_only() {
        let c = catalog(&[("meta/llama-70b:free", 1_700_000_000), ("meta/llama-70b", 1_700_000_000)]);
        let out = parse_catalog(&c, 1_700_100_000, &RankerOptions::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "meta/llama-70b:free");
    }

    #[test]
    fn filters_by_minimum_param_count() {
        let c = catalog(&[("meta/llama-7b:free", 1_700_000_000), ("meta/llama-70b:free", 1_700_000_000)]);
        let out = parse_catalog(&c, 1_700_100_000, &RankerOptions::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "meta/llama-70b:free");
    }

    #[test]
    fn filters_by_max_age_unless_disabled() {
        let now = 1_700_000_000i64;
        let old = now - 200 * 86_400;
        let c = catalog(&[("meta/llama-70b:free", old)]);
        let opts = RankerOptions::default();
        assert!(parse_catalog(&c, now, &opts).is_empty());
        let opts_unbounded = RankerOptions { max_age_days: 0, ..opts };
        assert_eq!(parse_catalog(&c, now, &opts_unbounded).len(), 1);
    }

    #[test]
    fn mixture_of_experts_multiplies_counts() {
        assert_eq!(parse_param_count_billion("mixtral-8x7b:free"), Some(56.0));
    }

    #[test]
    fn caps_at_ten_candidates() {
        let entries: Vec<(String, i64)> = (0..20).map(|i| (format!("m{i}/model-70b:free"), 1_700_000_000 + i)).collect();
        let refs: Vec<(&str, i64)> = entries.iter().map(|(s, c)| (s.as_str(), *c)).collect();
        let c = catalog(&refs);
        let out = parse_catalog(&c, 1_700_100_000, &RankerOptions::default());
        assert_eq!(out.len(), 10);
    }

    struct AlwaysOk;
    impl FreeModelProbe for AlwaysOk {
        fn probe(&self, _model_id: &str) -> Result<bool> {
            Ok(true)
        }
    }

    struct FirstFailsThenSucceeds(std::cell::Cell<bool>);
    impl FreeModelProbe for FirstFailsThenSucceeds {
        fn probe(&self, _model_id: &str) -> Result<bool> {
            Ok(self.0.replace(true))
        }
    }

    #[tokio::test]
    async fn picks_first_candidate_whose_probes_all_succeed() {
        let candidates = vec![
            FreeCandidate { id: "a".into(), param_count_billion: Some(70.0), created_unix: 0 },
            FreeCandidate { id: "b".into(), param_count_billion: Some(70.0), created_unix: 0 },
        ];
        let picked = rank(&candidates, &RankerOptions { runs: 0, ..Default::default() }, &AlwaysOk, false).await;
        assert_eq!(picked, Some("a".to_string()));
    }

    #[tokio::test]
    async fn candidate_with_empty_first_probe_is_skipped() {
        let candidates = vec![
            FreeCandidate { id: "a".into(), param_count_billion: Some(70.0), created_unix: 0 },
            FreeCandidate { id: "b".into(), param_count_billion: Some(70.0), created_unix: 0 },
        ];
        let picked = rank(&candidates, &RankerOptions { runs: 0, ..Default::default() }, &FirstFailsThenSucceeds(std::cell::Cell::new(false)), false).await;
        assert_eq!(picked, Some("b".to_string()));
    }
}
