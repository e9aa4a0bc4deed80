//! HTML fetch and "article-ish" text extraction (§4.4 steps 3-4).
//!
//! There is no DOM-readability crate in the dependency stack, so
//! extraction is a heuristic pass over `scraper`'s parsed tree: strip
//! script/style/nav/footer/aside, prefer `<article|main>` if present, and
//! otherwise fall back to `<body>`.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use summarize_core::{Error, Result, VideoKind, VideoRef};

pub struct FetchedPage {
    pub final_url: String,
    pub html: String,
}

/// Fetch `url` and report the post-redirect URL the caller must carry
/// forward as `ExtractedContent::url` (§4.4 step 6, §8 boundary behavior).
pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<FetchedPage> {
    let resp = client.get(url).send().await.map_err(|e| Error::Http(e.to_string()))?;
    let final_url = resp.url().to_string();
    if !resp.status().is_success() {
        return Err(Error::Extraction(format!("fetching {url} returned status {}", resp.status())));
    }
    let html = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
    Ok(FetchedPage { final_url, html })
}

pub struct ArticleContent {
    pub title: String,
    pub description: Option<String>,
    pub site_name: Option<String>,
    pub text: String,
}

const NOISE_TAGS: &[&str] = &["script", "style", "nav", "footer", "aside", "noscript", "svg", "form"];
const CONTENT_SELECTORS: &[&str] = &["article", "main", "[role=main]", "#content", ".content", ".post", ".entry-content"];

/// Heuristic article extraction: prefer a semantic content container, fall
/// back to `<body>` minus chrome elements, and treat "too little survived"
/// as a signal the caller should fall back to Firecrawl (§4.4 step 3).
pub fn extract_article(html: &str) -> ArticleContent {
    let document = Html::parse_document(html);

    let title = meta_content(&document, "og:title")
        .or_else(|| select_first_text(&document, "title"))
        .unwrap_or_default();
    let description = meta_content(&document, "og:description").or_else(|| meta_name_content(&document, "description"));
    let site_name = meta_content(&document, "og:site_name");

    let text = CONTENT_SELECTORS
        .iter()
        .find_map(|sel| {
            let selector = Selector::parse(sel).ok()?;
            document.select(&selector).next().map(|el| node_text(el))
        })
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| {
            let body_selector = Selector::parse("body").expect("body selector is static");
            document.select(&body_selector).next().map(node_text).unwrap_or_default()
        });

    ArticleContent { title, description, site_name, text }
}

/// Text looks extracted-but-thin ("blocked", JS-only shell, paywall
/// stub) when it clears a minimum length but is mostly whitespace-free
/// boilerplate; the extractor treats this the same as an empty result for
/// the "fall back to Firecrawl" decision.
pub fn looks_too_thin(text: &str) -> bool {
    text.split_whitespace().count() < 40
}

// The `regex` crate has no backreferences, so each noise tag gets its own
// non-capturing alternative rather than a single `<(tag)>...</\1>` pattern.
static NOISE_TAG_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let alternation = NOISE_TAGS
        .iter()
        .map(|tag| format!(r"<{tag}\b[^>]*>.*?</{tag}\s*>"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?is)(?:{alternation})")).expect("static noise-tag pattern")
});

/// Collect visible text from an element, skipping chrome subtrees and
/// collapsing whitespace the way a reader's clipboard-copy would. Noise
/// tags are stripped at the markup level before re-parsing, which sidesteps
/// manual DOM-tree ancestry walks for a one-shot heuristic extraction.
fn node_text(el: ElementRef) -> String {
    let cleaned = NOISE_TAG_PATTERN.replace_all(&el.html(), " ");
    let fragment = Html::parse_fragment(&cleaned);
    fragment
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn meta_content(document: &Html, property: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[property="{property}"]"#)).ok()?;
    document.select(&selector).next().and_then(|el| el.value().attr("content")).map(|s| s.to_string())
}

fn meta_name_content(document: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[name="{name}"]"#)).ok()?;
    document.select(&selector).next().and_then(|el| el.value().attr("content")).map(|s| s.to_string())
}

fn select_first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next().map(|el| el.text().collect::<Vec<_>>().join("").trim().to_string())
}

/// A page with no extractable article text but exactly one embedded
/// YouTube player (iframe or `og:video`) triggers the video-only
/// recursion in §4.4 step 4.
pub fn find_embedded_youtube(document_html: &str) -> Option<VideoRef> {
    let document = Html::parse_document(document_html);

    if let Some(url) = meta_content(&document, "og:video") {
        if crate::youtube::is_youtube_url(&url) {
            return Some(VideoRef { kind: VideoKind::Youtube, url });
        }
    }

    let iframe_selector = Selector::parse("iframe").ok()?;
    let mut candidates: Vec<String> = document
        .select(&iframe_selector)
        .filter_map(|el| el.value().attr("src"))
        .filter(|src| src.contains("youtube.com/embed") || src.contains("youtu.be"))
        .map(|s| s.to_string())
        .collect();
    candidates.dedup();

    if candidates.len() == 1 {
        return Some(VideoRef { kind: VideoKind::Youtube, url: candidates.remove(0) });
    }
    None
}
