//! Resolves a model-or-preset string into an ordered candidate list and
//! constructs the provider adapter for a chosen candidate (§4.1).

use std::sync::Arc;
use summarize_config::{Config, ConfigLoader, ModelPreset, PresetMode, PresetRule, RuleContext};

use crate::anthropic::AnthropicProvider;
use crate::model_id::ModelId;
use crate::openai::OpenAiProvider;
use crate::pricing::PricingTable;
use crate::provider::LlmProvider;

/// `auto` and `free` always resolve to *some* preset even when the user's
/// config never mentions them — §4.1's built-in presets.
fn built_in_preset(name: &str) -> Option<ModelPreset> {
    match name {
        "auto" => Some(ModelPreset {
            mode: PresetMode::Auto,
            rules: vec![PresetRule {
                when: None,
                candidates: vec!["anthropic/claude-opus-4-6".into(), "openai/gpt-4o".into()],
            }],
        }),
        // Populated by the refresh-free ranker (§4.9); empty until then.
        "free" => Some(ModelPreset { mode: PresetMode::Auto, rules: vec![] }),
        _ => None,
    }
}

pub struct ModelRegistry {
    config: Config,
    pricing: PricingTable,
}

impl ModelRegistry {
    pub fn new(config: Config) -> Self {
        Self { config, pricing: PricingTable::default() }
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    /// Ordered list of model ids to try for `model_or_preset` in `context`.
    /// A bare `provider/name` string short-circuits straight to itself; a
    /// preset name resolves through its rules, picking the first whose
    /// `when` (if any) contains `context`.
    pub fn candidates(&self, model_or_preset: &str, context: RuleContext) -> Vec<String> {
        if ModelId::parse(model_or_preset).is_some() {
            return vec![model_or_preset.to_string()];
        }
        let preset = self.config.models.get(model_or_preset).cloned().or_else(|| built_in_preset(model_or_preset));
        let Some(preset) = preset else { return vec![] };
        for rule in &preset.rules {
            let matches = rule.when.as_ref().map(|ctxs| ctxs.contains(&context)).unwrap_or(true);
            if matches && !rule.candidates.is_empty() {
                return rule.candidates.clone();
            }
        }
        vec![]
    }

    /// Build the provider adapter for one resolved candidate. `base_url_flag`
    /// is the CLI override, if any, checked first in the precedence chain.
    pub fn provider_for(&self, model_id: &ModelId, base_url_flag: Option<&str>) -> Option<Arc<dyn LlmProvider>> {
        match model_id.provider.as_str() {
            "anthropic" => {
                let base_url = ConfigLoader::resolve_base_url(base_url_flag, "ANTHROPIC_BASE_URL", self.config.anthropic.base_url.as_deref());
                let api_key = ConfigLoader::resolve_api_key(self.config.anthropic.api_key.as_deref(), "ANTHROPIC_API_KEY")?;
                let mut provider = AnthropicProvider::new(api_key);
                if let Some(url) = base_url {
                    provider = provider.with_base_url(url);
                }
                Some(Arc::new(provider))
            }
            "openai" => {
                let base_url = ConfigLoader::resolve_base_url(base_url_flag, "OPENAI_BASE_URL", self.config.openai.base_url.as_deref());
                let api_key = ConfigLoader::resolve_api_key(self.config.openai.api_key.as_deref(), "OPENAI_API_KEY")?;
                let mut provider = OpenAiProvider::new(api_key);
                if let Some(url) = base_url {
                    provider = provider.with_base_url(url);
                } else if self.config.openai.use_chat_completions {
                    provider = provider.with_chat_completions(true);
                }
                Some(Arc::new(provider))
            }
            // OpenAI-wire-compatible gateways share the chat-completions
            // adapter; env var names follow `{PROVIDER}_BASE_URL`/`_API_KEY`.
            other => {
                let env_prefix = other.to_uppercase().replace('-', "_");
                let base_url_env = format!("{env_prefix}_BASE_URL");
                let api_key_env = format!("{env_prefix}_API_KEY");
                let base_url = ConfigLoader::resolve_base_url(base_url_flag, &base_url_env, None)?;
                let api_key = ConfigLoader::resolve_api_key(None, &api_key_env)?;
                let provider = OpenAiProvider::new(api_key).with_base_url(base_url).with_provider_name(other.to_string());
                Some(Arc::new(provider))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_model_id_short_circuits_candidates() {
        let registry = ModelRegistry::new(Config::default());
        assert_eq!(registry.candidates("anthropic/claude-opus-4-6", RuleContext::Website), vec!["anthropic/claude-opus-4-6"]);
    }

    #[test]
    fn auto_preset_has_built_in_fallback() {
        let registry = ModelRegistry::new(Config::default());
        let candidates = registry.candidates("auto", RuleContext::Website);
        assert!(!candidates.is_empty());
    }

    #[test]
    fn unknown_preset_name_yields_no_candidates() {
        let registry = ModelRegistry::new(Config::default());
        assert!(registry.candidates("nonexistent-preset", RuleContext::Website).is_empty());
    }

    #[test]
    fn rule_with_matching_context_wins_over_unconditional_rule() {
        let mut config = Config::default();
        config.models.insert(
            "mixed".to_string(),
            ModelPreset {
                mode: PresetMode::Auto,
                rules: vec![
                    PresetRule { when: Some(vec![RuleContext::Youtube]), candidates: vec!["anthropic/yt-model".into()] },
                    PresetRule { when: None, candidates: vec!["anthropic/default-model".into()] },
                ],
            },
        );
        let registry = ModelRegistry::new(config);
        assert_eq!(registry.candidates("mixed", RuleContext::Youtube), vec!["anthropic/yt-model"]);
        assert_eq!(registry.candidates("mixed", RuleContext::Website), vec!["anthropic/default-model"]);
    }

    #[test]
    fn provider_for_anthropic_requires_api_key() {
        let registry = ModelRegistry::new(Config::default());
        let id = ModelId::parse("anthropic/claude-opus-4-6").unwrap();
        unsafe { std::env::remove_var("ANTHROPIC_API_KEY") };
        assert!(registry.provider_for(&id, None).is_none());
    }
}
