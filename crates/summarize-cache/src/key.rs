//! Deterministic cache-key derivation (§3 `CacheKey`).
//!
//! Every key is a blake3 digest (a collision-resistant 256-bit hash,
//! rendered lowercase hex) over a canonical, field-ordered JSON encoding of
//! its documented inputs. Using `serde_json::Value` as the intermediate
//! form guarantees stable field ordering regardless of struct declaration
//! order, and guarantees that two calls with the same logical inputs
//! produce byte-identical input to the hasher.

use serde::Serialize;
use summarize_core::FORMAT_VERSION;

fn digest(parts: &[(&str, serde_json::Value)]) -> String {
    // BTreeMap sorts by key, giving a canonical ordering independent of
    // the order `parts` was built in.
    let map: std::collections::BTreeMap<&str, serde_json::Value> = parts.iter().cloned().collect();
    let canonical = serde_json::to_string(&map).expect("map of JSON values always serializes");
    blake3::hash(canonical.as_bytes()).to_hex().to_string()
}

fn json<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).expect("value must serialize")
}

/// `H(url, namespace, fileMtime?, formatVersion)`
pub fn transcript_key(url: &str, namespace: &str, file_mtime: Option<i64>) -> String {
    digest(&[
        ("url", json(&url)),
        ("namespace", json(&namespace)),
        ("fileMtime", json(&file_mtime)),
        ("formatVersion", json(&FORMAT_VERSION)),
    ])
}

/// `H(url, extractSettings, formatVersion)`
pub fn content_key<S: Serialize>(url: &str, extract_settings: &S) -> String {
    digest(&[
        ("url", json(&url)),
        ("extractSettings", json(extract_settings)),
        ("formatVersion", json(&FORMAT_VERSION)),
    ])
}

/// `H(contentHash, promptHash, model, length, language, formatVersion)`
pub fn summary_key(content_hash: &str, prompt_hash: &str, model: &str, length: &str, language: &str) -> String {
    digest(&[
        ("contentHash", json(&content_hash)),
        ("promptHash", json(&prompt_hash)),
        ("model", json(&model)),
        ("length", json(&length)),
        ("language", json(&language)),
        ("formatVersion", json(&FORMAT_VERSION)),
    ])
}

/// `H(url, slideSettings, formatVersion)`
pub fn slides_key<S: Serialize>(url: &str, slide_settings: &S) -> String {
    digest(&[
        ("url", json(&url)),
        ("slideSettings", json(slide_settings)),
        ("formatVersion", json(&FORMAT_VERSION)),
    ])
}

/// Content-hash used as the `contentHash` input to `summary_key`: the
/// blake3 digest of the normalized article text (§4.3.3). Two different
/// URLs whose normalized content is byte-identical hash to the same value
/// and therefore share a cached summary.
pub fn content_hash(normalized_content: &str) -> String {
    blake3::hash(normalized_content.as_bytes()).to_hex().to_string()
}

/// Hash used to derive a media-cache file name from its source URL.
pub fn url_hash(url: &str) -> String {
    blake3::hash(url.as_bytes()).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_pure_function_of_documented_inputs() {
        let a = content_key("https://a/", &serde_json::json!({"firecrawl": "auto"}));
        let b = content_key("https://a/", &serde_json::json!({"firecrawl": "auto"}));
        assert_eq!(a, b);
    }

    #[test]
    fn key_ignores_field_order_in_settings() {
        let a = content_key("https://a/", &serde_json::json!({"firecrawl": "auto", "markdown": "off"}));
        let b = content_key("https://a/", &serde_json::json!({"markdown": "off", "firecrawl": "auto"}));
        assert_eq!(a, b);
    }

    #[test]
    fn key_changes_with_url() {
        let a = content_key("https://a/", &serde_json::json!({}));
        let b = content_key("https://b/", &serde_json::json!({}));
        assert_ne!(a, b);
    }

    #[test]
    fn identical_normalized_content_shares_hash_across_urls() {
        let h1 = content_hash("hello world");
        let h2 = content_hash("hello world");
        assert_eq!(h1, h2);
    }

    #[test]
    fn changing_format_version_changes_every_key() {
        let a = digest(&[("url", json(&"https://a/")), ("formatVersion", json(&1u32))]);
        let b = digest(&[("url", json(&"https://a/")), ("formatVersion", json(&2u32))]);
        assert_ne!(a, b);
    }
}
