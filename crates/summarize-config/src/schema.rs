//! The on-disk config shape (§6). This is a compatibility surface — field
//! names and defaults must match what the spec documents, since existing
//! `~/.summarize/config.json` files are read by every new version.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use summarize_core::VerifyMode;

/// Root configuration object. Anything absent from the JSON file falls
/// back to these defaults; a non-object top-level JSON value is rejected
/// by the loader before it ever reaches `serde`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Default model id or preset name, e.g. `"anthropic/claude-opus-4-6"`,
    /// `"auto"`, or `"free"`.
    pub model: String,
    /// Named model-selection presets, keyed by name. Built-in `auto` and
    /// `free` presets are always available even if absent here; entries
    /// here override or add to them.
    pub models: HashMap<String, ModelPreset>,
    pub language: String,
    pub anthropic: ProviderConfig,
    pub openai: OpenAiConfig,
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "auto".to_string(),
            models: HashMap::new(),
            language: "en".to_string(),
            anthropic: ProviderConfig::default(),
            openai: OpenAiConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    /// A config-file API key wins over the like-named env var (§10.3) —
    /// the reverse of the base-URL precedence.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OpenAiConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Forces the chat-completions wire shape instead of the default
    /// responses shape. Automatically implied by a custom `base_url`
    /// (§4.1) but can also be set explicitly.
    pub use_chat_completions: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_mb: u64,
    pub ttl_days: u64,
    pub path: Option<PathBuf>,
    pub media: MediaCacheConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_mb: 512,
            ttl_days: 30,
            path: None,
            media: MediaCacheConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MediaCacheConfig {
    pub enabled: bool,
    pub max_mb: u64,
    pub ttl_days: u64,
    pub path: Option<PathBuf>,
    pub verify: VerifyMode,
}

impl Default for MediaCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_mb: 2048,
            ttl_days: 7,
            path: None,
            verify: VerifyMode::None,
        }
    }
}

/// A named model-selection strategy (§4.1): `free`, `auto`, or a
/// user-defined preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPreset {
    pub mode: PresetMode,
    pub rules: Vec<PresetRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetMode {
    Auto,
}

/// One rule in a preset: an optional context filter plus an ordered
/// candidate list. Resolution picks the first matching rule, then
/// iterates `candidates` until one has credentials and produces non-empty
/// output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetRule {
    #[serde(default, rename = "when")]
    pub when: Option<Vec<RuleContext>>,
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleContext {
    Website,
    Asset,
    Youtube,
}

/// Non-fatal finding surfaced during `Config::validate`. Hard errors are
/// returned directly as `summarize_core::Error::Configuration`; these are
/// logged via `tracing::warn` instead of aborting load.
#[derive(Debug, Clone)]
pub struct ConfigWarning(pub String);

impl Config {
    /// Structural validation that doesn't require knowledge of which
    /// providers/presets exist at runtime (that's `summarize-llm`'s job
    /// when it resolves a model). Returns warnings to log, or an error
    /// for a config so malformed a run cannot proceed.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let mut warnings = Vec::new();

        if self.cache.max_mb == 0 {
            return Err("cache.maxMb must be greater than zero".to_string());
        }
        if self.cache.media.max_mb == 0 {
            return Err("cache.media.maxMb must be greater than zero".to_string());
        }
        for (name, preset) in &self.models {
            if preset.rules.is_empty() {
                warnings.push(ConfigWarning(format!(
                    "preset '{name}' has no rules and will never match"
                )));
            }
            for rule in &preset.rules {
                if rule.candidates.is_empty() {
                    warnings.push(ConfigWarning(format!(
                        "preset '{name}' has a rule with no candidate models"
                    )));
                }
            }
        }
        if self.model.trim().is_empty() {
            warnings.push(ConfigWarning(
                "`model` is empty; falling back to built-in `auto` preset".to_string(),
            ));
        }

        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let c = Config::default();
        assert_eq!(c.model, "auto");
        assert_eq!(c.cache.max_mb, 512);
        assert_eq!(c.cache.ttl_days, 30);
        assert_eq!(c.cache.media.max_mb, 2048);
        assert_eq!(c.cache.media.ttl_days, 7);
        assert_eq!(c.cache.media.verify, VerifyMode::None);
    }

    #[test]
    fn validate_rejects_zero_cap() {
        let mut c = Config::default();
        c.cache.max_mb = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn validate_warns_on_empty_candidates() {
        let mut c = Config::default();
        c.models.insert(
            "broken".to_string(),
            ModelPreset { mode: PresetMode::Auto, rules: vec![PresetRule { when: None, candidates: vec![] }] },
        );
        let warnings = c.validate().unwrap();
        assert!(!warnings.is_empty());
    }
}
