use std::io::Write;
use summarize_config::{CacheConfig, Config, ConfigLoader};

#[test]
fn config_defaults_match_spec() {
    let config = Config::default();
    assert_eq!(config.model, "auto");
    assert_eq!(config.language, "en");
    assert_eq!(config.cache.max_mb, 512);
    assert_eq!(config.cache.ttl_days, 30);
    assert_eq!(config.cache.media.max_mb, 2048);
    assert_eq!(config.cache.media.ttl_days, 7);
}

#[test]
fn cache_config_defaults() {
    let cache = CacheConfig::default();
    assert!(cache.enabled);
    assert!(cache.path.is_none());
    assert!(cache.media.enabled);
}

#[test]
fn loader_round_trips_full_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let mut f = std::fs::File::create(&path).unwrap();
    write!(
        f,
        r#"{{
            "model": "openrouter/some-model",
            "language": "fr",
            "anthropic": {{"baseUrl": "https://proxy.example/anthropic"}},
            "openai": {{"baseUrl": "https://proxy.example/openai", "useChatCompletions": true}},
            "cache": {{
                "enabled": true,
                "maxMb": 1024,
                "ttlDays": 14,
                "media": {{"enabled": false, "maxMb": 4096, "verify": "hash"}}
            }}
        }}"#
    )
    .unwrap();

    let loader = ConfigLoader::load(Some(&path)).unwrap();
    let c = loader.get();
    assert_eq!(c.model, "openrouter/some-model");
    assert_eq!(c.language, "fr");
    assert_eq!(c.anthropic.base_url.as_deref(), Some("https://proxy.example/anthropic"));
    assert!(c.openai.use_chat_completions);
    assert_eq!(c.cache.max_mb, 1024);
    assert_eq!(c.cache.ttl_days, 14);
    assert!(!c.cache.media.enabled);
    assert_eq!(c.cache.media.max_mb, 4096);
}

#[test]
fn loader_resolve_path_precedence() {
    let explicit = std::path::PathBuf::from("/tmp/explicit.json");
    assert_eq!(ConfigLoader::resolve_path(Some(&explicit)), explicit);
}

#[test]
fn loader_rejects_bad_json_with_path_in_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "not json at all").unwrap();
    let err = ConfigLoader::load(Some(&path)).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains(&path.display().to_string()));
}
