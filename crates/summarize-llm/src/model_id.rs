//! Model identifier parsing (§4.1): `provider/name`. Parsing is purely
//! lexical — the first `/` splits, everything after it is the
//! provider-native model name, including further slashes.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelId {
    pub provider: String,
    pub name: String,
}

impl ModelId {
    pub fn parse(raw: &str) -> Option<Self> {
        let (provider, name) = raw.split_once('/')?;
        if provider.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self { provider: provider.to_string(), name: name.to_string() })
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_first_slash_only() {
        let id = ModelId::parse("openrouter/meta-llama/llama-3-70b").unwrap();
        assert_eq!(id.provider, "openrouter");
        assert_eq!(id.name, "meta-llama/llama-3-70b");
    }

    #[test]
    fn rejects_missing_slash() {
        assert!(ModelId::parse("claude-opus-4-6").is_none());
    }

    #[test]
    fn rejects_empty_provider_or_name() {
        assert!(ModelId::parse("/name").is_none());
        assert!(ModelId::parse("provider/").is_none());
    }

    #[test]
    fn display_round_trips() {
        let id = ModelId { provider: "anthropic".into(), name: "claude-opus-4-6".into() };
        assert_eq!(id.to_string(), "anthropic/claude-opus-4-6");
    }
}
