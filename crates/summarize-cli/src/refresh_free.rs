//! `summarize refresh-free` (§4.9): probes OpenRouter's free-tier catalog
//! and persists the best surviving candidate under the `free` preset.

use summarize_config::{ConfigLoader, ModelPreset, PresetMode, PresetRule};
use summarize_core::{Error, Result};
use summarize_llm::{FreeModelProbe, RankerOptions, parse_catalog, rank};
use tracing::{info, warn};

const CATALOG_URL: &str = "https://openrouter.ai/api/v1/models";
const CHAT_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

struct OpenRouterProbe {
    client: reqwest::Client,
    api_key: String,
}

impl FreeModelProbe for OpenRouterProbe {
    fn probe(&self, model_id: &str) -> Result<bool> {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(self.probe_async(model_id)))
    }
}

impl OpenRouterProbe {
    async fn probe_async(&self, model_id: &str) -> Result<bool> {
        let response = self
            .client
            .post(CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": model_id,
                "messages": [{"role": "user", "content": "Reply with the single word OK."}],
                "max_tokens": 8,
            }))
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            return Err(Error::RateLimited { retry_after_secs });
        }
        if !response.status().is_success() {
            return Err(Error::Http(format!("openrouter returned {}", response.status())));
        }
        let body: serde_json::Value = response.json().await.map_err(|e| Error::Http(e.to_string()))?;
        let text = body["choices"][0]["message"]["content"].as_str().unwrap_or("");
        Ok(!text.trim().is_empty())
    }
}

pub async fn run(runs: u32, min_params: f64, max_age_days: u32, verbose: bool) -> Result<()> {
    let api_key = std::env::var("OPENROUTER_API_KEY").map_err(|_| Error::InputValidation("OPENROUTER_API_KEY is not set".to_string()))?;
    let client = reqwest::Client::builder().timeout(std::time::Duration::from_secs(30)).build().map_err(|e| Error::Http(e.to_string()))?;

    info!("fetching openrouter model catalog");
    let catalog: serde_json::Value = client
        .get(CATALOG_URL)
        .bearer_auth(&api_key)
        .send()
        .await
        .map_err(|e| Error::Http(e.to_string()))?
        .json()
        .await
        .map_err(|e| Error::Http(e.to_string()))?;

    let opts = RankerOptions { min_params_billion: min_params, max_age_days, runs };
    let now_unix = chrono::Utc::now().timestamp();
    let candidates = parse_catalog(&catalog, now_unix, &opts);
    if candidates.is_empty() {
        warn!("no free-tier candidates passed the filters");
        println!("no candidates found");
        return Ok(());
    }
    if verbose {
        info!(count = candidates.len(), "probing candidates");
    }

    let probe = OpenRouterProbe { client, api_key };
    let chosen = rank(&candidates, &opts, &probe, verbose).await;

    match chosen {
        Some(model_id) => {
            persist_choice(&model_id)?;
            println!("{model_id}");
        }
        None => {
            warn!("no candidate survived probing");
            println!("no candidate survived probing");
        }
    }
    Ok(())
}

fn persist_choice(model_id: &str) -> Result<()> {
    let path = ConfigLoader::resolve_path(None);
    let loader = ConfigLoader::load(Some(&path))?;
    let mut config = loader.get();
    config.models.insert(
        "free".to_string(),
        ModelPreset { mode: PresetMode::Auto, rules: vec![PresetRule { when: None, candidates: vec![format!("openrouter/{model_id}")] }] },
    );

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, serde_json::to_vec_pretty(&config)?)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}
