//! `sourceId` derivation for non-YouTube sources (GLOSSARY: "`<slug>-<shortHash>` for direct media").
//! YouTube `sourceId`s are the video id itself, already resolved by the
//! extractor — this module only covers the direct-media case.

fn slugify(input: &str) -> String {
    let slug: String = input
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let collapsed: Vec<&str> = slug.split('-').filter(|s| !s.is_empty()).collect();
    let joined = collapsed.join("-");
    if joined.is_empty() {
        "media".to_string()
    } else {
        joined.chars().take(48).collect()
    }
}

/// `<slug>-<shortHash>`, where the slug comes from the URL's final path
/// segment (extension stripped) and the hash is the first 8 hex
/// characters of a blake3 digest of the full URL.
pub fn direct_media_source_id(url: &str) -> String {
    let last_segment = url::Url::parse(url)
        .ok()
        .and_then(|u| u.path_segments().and_then(|mut s| s.next_back().map(|s| s.to_string())))
        .unwrap_or_else(|| url.to_string());
    let stem = last_segment.rsplit_once('.').map(|(stem, _)| stem.to_string()).unwrap_or(last_segment);
    let slug = slugify(&stem);
    let hash = blake3::hash(url.as_bytes()).to_hex().to_string();
    format!("{slug}-{}", &hash[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_slug_from_final_path_segment() {
        let id = direct_media_source_id("https://example.com/videos/My Cool Clip.mp4");
        assert!(id.starts_with("my-cool-clip-"));
    }

    #[test]
    fn is_deterministic() {
        let a = direct_media_source_id("https://example.com/a.mp4");
        let b = direct_media_source_id("https://example.com/a.mp4");
        assert_eq!(a, b);
    }

    #[test]
    fn differs_across_urls_with_same_filename() {
        let a = direct_media_source_id("https://example.com/a/clip.mp4");
        let b = direct_media_source_id("https://example.com/b/clip.mp4");
        assert_ne!(a, b);
    }
}
