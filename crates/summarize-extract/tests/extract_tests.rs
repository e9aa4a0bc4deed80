use summarize_cache::{MetadataCache, Namespace};
use summarize_core::{TranscriptInfo, UrlKind};
use summarize_extract::{html, youtube};

#[test]
fn urls_classify_as_website_or_asset() {
    assert_eq!(UrlKind::classify("https://example.com/blog/post"), UrlKind::Website);
    assert_eq!(UrlKind::classify("https://example.com/audio/episode.mp3"), UrlKind::Asset);
}

#[test]
fn video_only_page_detection_matches_the_extract_article_pipeline() {
    let page = r#"<html><head><title>Empty shell</title></head>
        <body><div id="app"></div><iframe src="https://www.youtube.com/embed/dQw4w9WgXcQ"></iframe></body></html>"#;
    let article = html::extract_article(page);
    assert!(html::looks_too_thin(&article.text));
    let video = html::find_embedded_youtube(page).unwrap();
    assert!(youtube::is_youtube_url(&video.url));
}

#[test]
fn transcript_cache_round_trips_through_the_shared_transcript_namespace() {
    let cache = MetadataCache::open_in_memory(10_000_000, 86_400_000).unwrap();
    let key = summarize_cache::transcript_key("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "yt:transcript", None);
    let info = TranscriptInfo {
        source: "timedtext".to_string(),
        chars: 11,
        word_count: 2,
        metadata: serde_json::json!({"text": "hello world"}),
    };
    cache.put(Namespace::Transcript, &key, &serde_json::to_value(&info).unwrap()).unwrap();

    let fetched = cache.get(Namespace::Transcript, &key).unwrap().unwrap();
    let roundtripped: TranscriptInfo = serde_json::from_value(fetched).unwrap();
    assert_eq!(roundtripped.metadata["text"], "hello world");
}

#[test]
fn content_key_is_shared_across_urls_once_normalized() {
    // Two distinct source URLs with the same extract settings still get
    // distinct content-cache keys — only normalized *content* is shared
    // (§4.3.3), which is `summarize-run`'s concern, not the extractor's.
    let settings = summarize_core::ExtractSettings::default();
    let a = summarize_cache::content_key("https://a.example/", &settings);
    let b = summarize_cache::content_key("https://b.example/", &settings);
    assert_ne!(a, b);
}
