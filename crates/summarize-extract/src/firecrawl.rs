//! Firecrawl Markdown fallback (§4.4 step 3). Only invoked when a key is
//! configured and either `firecrawl=always` or (`auto` and the raw-HTML
//! pass came back thin/blocked).

use summarize_core::{Error, Result};

const SCRAPE_ENDPOINT: &str = "https://api.firecrawl.dev/v1/scrape";

pub struct FirecrawlResult {
    pub markdown: String,
    pub title: Option<String>,
}

pub async fn scrape(client: &reqwest::Client, api_key: &str, url: &str) -> Result<FirecrawlResult> {
    let resp = client
        .post(SCRAPE_ENDPOINT)
        .bearer_auth(api_key)
        .json(&serde_json::json!({ "url": url, "formats": ["markdown"] }))
        .send()
        .await
        .map_err(|e| Error::Http(e.to_string()))?;

    if !resp.status().is_success() {
        return Err(Error::Extraction(format!("firecrawl responded {} for {url}", resp.status())));
    }

    let body: serde_json::Value = resp.json().await.map_err(|e| Error::Http(e.to_string()))?;
    let markdown = body["data"]["markdown"]
        .as_str()
        .ok_or_else(|| Error::Extraction("firecrawl response had no markdown field".into()))?
        .to_string();
    let title = body["data"]["metadata"]["title"].as_str().map(|s| s.to_string());

    Ok(FirecrawlResult { markdown, title })
}
