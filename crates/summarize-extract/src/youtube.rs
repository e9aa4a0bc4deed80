//! YouTube URL detection, video-id extraction, and transcript resolution
//! (§4.4 step 1). Three strategies are tried in order: the `timedtext`
//! caption endpoint YouTube serves unauthenticated, caption tracks parsed
//! out of the page's embedded player config, and — only if a token is
//! configured — an external transcript actor.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use summarize_core::{Error, Result, TranscriptInfo};
use tracing::{debug, warn};

static VIDEO_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?:youtube\.com/watch\?v=|youtube\.com/shorts/|youtu\.be/|youtube\.com/embed/|youtube\.com/v/)([A-Za-z0-9_-]{11})").unwrap(),
        Regex::new(r"[?&]v=([A-Za-z0-9_-]{11})").unwrap(),
    ]
});

/// `true` for any host under `youtube.com`/`youtu.be`, independent of
/// whether a video id can actually be extracted from the path.
pub fn is_youtube_url(url: &str) -> bool {
    let Ok(parsed) = url::Url::parse(url) else { return false };
    let Some(host) = parsed.host_str() else { return false };
    let host = host.trim_start_matches("www.").trim_start_matches("m.");
    host == "youtube.com" || host == "youtu.be" || host == "music.youtube.com"
}

/// Pull the 11-character video id out of any of the common YouTube URL
/// shapes (`watch?v=`, `youtu.be/`, `shorts/`, `embed/`).
pub fn extract_video_id(url: &str) -> Option<String> {
    for pattern in VIDEO_ID_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(url) {
            return Some(captures[1].to_string());
        }
    }
    None
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Caption track reference parsed out of `ytInitialPlayerResponse`.
#[derive(Debug, Clone)]
struct CaptionTrack {
    base_url: String,
    language_code: String,
}

/// Try the public `timedtext` endpoint first (no page fetch required),
/// then fall back to scraping the watch page for caption tracks, then
/// (if `apify_token` is set) an external transcript actor. Returns the
/// first non-empty transcript; each failed strategy is logged and the
/// caller moves on rather than treating it as terminal (§4.4, §7).
pub async fn fetch_transcript(
    client: &reqwest::Client,
    video_id: &str,
    apify_token: Option<&str>,
) -> Result<TranscriptInfo> {
    match fetch_via_timedtext(client, video_id).await {
        Ok(info) => return Ok(info),
        Err(e) => debug!(video_id, error = %e, "timedtext transcript fetch failed"),
    }

    match fetch_via_caption_tracks(client, video_id).await {
        Ok(info) => return Ok(info),
        Err(e) => debug!(video_id, error = %e, "caption-track transcript fetch failed"),
    }

    if let Some(token) = apify_token {
        match fetch_via_actor(client, video_id, token).await {
            Ok(info) => return Ok(info),
            Err(e) => warn!(video_id, error = %e, "transcript actor call failed"),
        }
    }

    Err(Error::Extraction(format!(
        "no transcript available for youtube video {video_id}"
    )))
}

async fn fetch_via_timedtext(client: &reqwest::Client, video_id: &str) -> Result<TranscriptInfo> {
    let url = format!("https://www.youtube.com/api/timedtext?lang=en&v={video_id}&fmt=json3");
    let resp = client.get(&url).send().await.map_err(|e| Error::Http(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(Error::Extraction(format!("timedtext responded {}", resp.status())));
    }
    let body: serde_json::Value = resp.json().await.map_err(|e| Error::Http(e.to_string()))?;
    let events = body["events"].as_array().ok_or_else(|| Error::Extraction("timedtext body has no events".into()))?;
    let mut text = String::new();
    for event in events {
        if let Some(segs) = event["segs"].as_array() {
            for seg in segs {
                if let Some(piece) = seg["utf8"].as_str() {
                    text.push_str(piece);
                }
            }
        }
    }
    if text.trim().is_empty() {
        return Err(Error::Extraction("timedtext transcript is empty".into()));
    }
    Ok(transcript_info("timedtext", &text))
}

async fn fetch_via_caption_tracks(client: &reqwest::Client, video_id: &str) -> Result<TranscriptInfo> {
    let watch_url = watch_url(video_id);
    let resp = client.get(&watch_url).send().await.map_err(|e| Error::Http(e.to_string()))?;
    let html = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
    let track = find_caption_track(&html)
        .ok_or_else(|| Error::Extraction("no caption tracks found in watch page".into()))?;
    let caption_xml = client
        .get(&track.base_url)
        .send()
        .await
        .map_err(|e| Error::Http(e.to_string()))?
        .text()
        .await
        .map_err(|e| Error::Http(e.to_string()))?;
    let text = strip_caption_markup(&caption_xml);
    if text.trim().is_empty() {
        return Err(Error::Extraction("caption track body is empty".into()));
    }
    Ok(transcript_info(&format!("caption-track:{}", track.language_code), &text))
}

/// `ytInitialPlayerResponse = {...};` is assigned inline in a `<script>`
/// tag on the watch page; scan for it the way a page scraper would rather
/// than pulling in a full JS evaluator.
fn find_caption_track(html: &str) -> Option<CaptionTrack> {
    let document = Html::parse_document(html);
    let script_selector = Selector::parse("script").ok()?;
    let marker = "var ytInitialPlayerResponse = ";
    let json_text = document
        .select(&script_selector)
        .map(|el| el.inner_html())
        .find(|html| html.contains(marker))
        .and_then(|html| {
            let start = html.find(marker)? + marker.len();
            let rest = &html[start..];
            let end = rest.rfind(";")?;
            Some(rest[..end].trim().to_string())
        })?;
    let parsed: serde_json::Value = serde_json::from_str(&json_text).ok()?;
    let tracks = parsed["captions"]["playerCaptionsTracklistRenderer"]["captionTracks"].as_array()?;
    let first = tracks.first()?;
    Some(CaptionTrack {
        base_url: first["baseUrl"].as_str()?.to_string(),
        language_code: first["languageCode"].as_str().unwrap_or("und").to_string(),
    })
}

fn strip_caption_markup(xml: &str) -> String {
    static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
    let without_tags = TAG.replace_all(xml, " ");
    without_tags
        .replace("&amp;", "&")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// External transcript actor, used only when neither direct strategy
/// succeeds and an Apify token is configured (§6 `APIFY_API_TOKEN`).
async fn fetch_via_actor(client: &reqwest::Client, video_id: &str, token: &str) -> Result<TranscriptInfo> {
    let url = "https://api.apify.com/v2/acts/pintostudio~youtube-transcript-scraper/run-sync-get-dataset-items";
    let resp = client
        .post(url)
        .query(&[("token", token)])
        .json(&serde_json::json!({ "videoUrl": watch_url(video_id) }))
        .send()
        .await
        .map_err(|e| Error::Http(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(Error::Extraction(format!("transcript actor responded {}", resp.status())));
    }
    let items: Vec<serde_json::Value> = resp.json().await.map_err(|e| Error::Http(e.to_string()))?;
    let text = items
        .iter()
        .filter_map(|item| item["data"].as_array())
        .flatten()
        .filter_map(|seg| seg["text"].as_str())
        .collect::<Vec<_>>()
        .join(" ");
    if text.trim().is_empty() {
        return Err(Error::Extraction("transcript actor returned no segments".into()));
    }
    Ok(transcript_info("apify-actor", &text))
}

fn transcript_info(source: &str, text: &str) -> TranscriptInfo {
    TranscriptInfo {
        source: source.to_string(),
        chars: text.chars().count(),
        word_count: text.split_whitespace().count(),
        metadata: serde_json::json!({ "text": text }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_youtube_hosts() {
        assert!(is_youtube_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://m.youtube.com/shorts/dQw4w9WgXcQ"));
        assert!(!is_youtube_url("https://example.com/video"));
    }

    #[test]
    fn extracts_video_id_from_watch_url() {
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), Some("dQw4w9WgXcQ".to_string()));
    }

    #[test]
    fn extracts_video_id_from_short_url() {
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ"), Some("dQw4w9WgXcQ".to_string()));
    }

    #[test]
    fn extracts_video_id_from_embed_url() {
        assert_eq!(extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ?autoplay=1"), Some("dQw4w9WgXcQ".to_string()));
    }

    #[test]
    fn returns_none_for_non_youtube_url() {
        assert_eq!(extract_video_id("https://example.com/video"), None);
    }

    #[test]
    fn strips_caption_markup_and_entities() {
        let xml = r#"<transcript><text start="0" dur="1">Hello &amp; welcome</text></transcript>"#;
        assert_eq!(strip_caption_markup(xml), "Hello & welcome");
    }

    #[test]
    fn finds_caption_track_in_embedded_player_response() {
        let html = r#"<html><body><script>var ytInitialPlayerResponse = {"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://example.com/caps","languageCode":"en"}]}}};</script></body></html>"#;
        let track = find_caption_track(html).unwrap();
        assert_eq!(track.base_url, "https://example.com/caps");
        assert_eq!(track.language_code, "en");
    }
}
