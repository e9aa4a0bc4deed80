use summarize_cache::{MediaCache, MetadataCache, Namespace};
use summarize_core::VerifyMode;

#[test]
fn metadata_cache_ttl_sweep_is_monotonic_across_namespaces() {
    let cache = MetadataCache::open_in_memory(1_000_000, 0).unwrap();
    cache.put(Namespace::Transcript, "t1", &serde_json::json!("transcript")).unwrap();
    cache.put(Namespace::Summary, "s1", &serde_json::json!("summary")).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    assert!(cache.get(Namespace::Transcript, "t1").unwrap().is_none());
    assert!(cache.get(Namespace::Summary, "s1").unwrap().is_none());
    assert_eq!(cache.stats().unwrap().entries, 0);
}

#[test]
fn metadata_cache_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.sqlite3");
    {
        let cache = MetadataCache::open(&path, 1_000_000, 86_400_000).unwrap();
        cache.put(Namespace::Content, "c1", &serde_json::json!({"body": "hi"})).unwrap();
    }
    let reopened = MetadataCache::open(&path, 1_000_000, 86_400_000).unwrap();
    assert_eq!(
        reopened.get(Namespace::Content, "c1").unwrap().unwrap(),
        serde_json::json!({"body": "hi"})
    );
}

/// Scenario: a media asset is downloaded, cached, and evicted once newer
/// downloads push the store over its configured byte cap (§4.3.2 scenario 2).
#[test]
fn media_cache_evicts_when_over_byte_cap() {
    let dir = tempfile::tempdir().unwrap();
    let cache = MediaCache::open(dir.path(), 16, 86_400_000, VerifyMode::None).unwrap();

    cache.put("https://host/a.mp3", b"12345678", "mp3", Some("audio/mpeg".into()), None, None).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(2));
    cache.put("https://host/b.mp3", b"abcdefgh", "mp3", Some("audio/mpeg".into()), None, None).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(2));

    let (_, total_before) = cache.stats();
    assert!(total_before <= 16);

    // A third, larger download forces eviction of the least-recently
    // accessed entry ("a.mp3", never re-fetched since the initial put).
    cache
        .put("https://host/c.mp3", b"0123456789", "mp3", Some("audio/mpeg".into()), None, None)
        .unwrap();

    assert!(cache.get("https://host/a.mp3").unwrap().is_none());
    let (_, total_after) = cache.stats();
    assert!(total_after <= 16);
}

/// Scenario: `verify = hash` catches silent corruption of a cached file on
/// disk and treats the entry as a miss rather than serving bad bytes
/// (§4.3.2 scenario 3).
#[test]
fn media_cache_verify_hash_rejects_tampered_file() {
    let dir = tempfile::tempdir().unwrap();
    let cache = MediaCache::open(dir.path(), 1_000_000, 86_400_000, VerifyMode::Hash).unwrap();

    let (entry, _path) = cache
        .put("https://host/video.mp4", b"not actually a video", "mp4", Some("video/mp4".into()), None, None)
        .unwrap();

    // Simulate bit rot / manual tampering of the cached file.
    std::fs::write(dir.path().join(&entry.file_name), b"corrupted bytes here").unwrap();

    assert!(cache.get("https://host/video.mp4").unwrap().is_none());
    // The corrupted entry is evicted from the index too, not just rejected
    // in place, so a later re-download isn't blocked by a stale entry.
    let (count, _) = cache.stats();
    assert_eq!(count, 0);
}

#[test]
fn media_cache_ttl_expiry_removes_backing_file() {
    let dir = tempfile::tempdir().unwrap();
    let cache = MediaCache::open(dir.path(), 1_000_000, 86_400_000, VerifyMode::None).unwrap();
    let (entry, _path) = cache.put("https://host/x.bin", b"data", "bin", None, None, Some(0)).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(2));

    assert!(cache.get("https://host/x.bin").unwrap().is_none());
    assert!(!dir.path().join(&entry.file_name).exists());
}

/// Two distinct source URLs whose extracted articles are byte-identical
/// after normalization share the same summary-cache key, so a cache hit
/// on one serves the other without a second LLM call (§4.3.3).
#[test]
fn summary_cache_key_is_shared_across_urls_with_identical_content() {
    use summarize_cache::{content_hash, summary_key};

    let normalized = "identical article body after whitespace collapse";
    let hash_a = content_hash(normalized);
    let hash_b = content_hash(normalized);
    assert_eq!(hash_a, hash_b);

    let key_a = summary_key(&hash_a, "prompt-v1", "anthropic/claude-opus-4-6", "short", "en");
    let key_b = summary_key(&hash_b, "prompt-v1", "anthropic/claude-opus-4-6", "short", "en");
    assert_eq!(key_a, key_b);

    let cache = MetadataCache::open_in_memory(1_000_000, 86_400_000).unwrap();
    cache.put(Namespace::Summary, &key_a, &serde_json::json!({"summary": "..."})).unwrap();
    assert!(cache.get(Namespace::Summary, &key_b).unwrap().is_some());
}
