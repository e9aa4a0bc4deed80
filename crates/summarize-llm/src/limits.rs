//! Per-model input-token caps (§4.7 step 8, §7 "Input too large"). Two-tier
//! lookup mirrors [`crate::pricing::PricingTable`]: an exact `provider/model`
//! entry wins, falling back to the provider-less model name, falling back
//! to a conservative default for anything unlisted.

use std::collections::HashMap;

const DEFAULT_INPUT_TOKEN_CAP: u64 = 128_000;

pub struct ContextWindowTable {
    by_full_id: HashMap<String, u64>,
    by_model_name: HashMap<String, u64>,
}

impl Default for ContextWindowTable {
    fn default() -> Self {
        Self::built_in()
    }
}

impl ContextWindowTable {
    pub fn built_in() -> Self {
        let mut by_full_id = HashMap::new();
        let mut by_model_name = HashMap::new();

        let rows: &[(&str, u64)] = &[
            ("anthropic/claude-opus-4-6", 200_000),
            ("anthropic/claude-sonnet-4-20250514", 200_000),
            ("anthropic/claude-haiku-3-5", 200_000),
            ("openai/gpt-4o", 128_000),
            ("openai/gpt-4o-mini", 128_000),
            ("openai/gpt-4-turbo", 128_000),
            ("openai/o1", 200_000),
            ("openai/o1-mini", 128_000),
            ("openai/o3", 200_000),
            ("openai/o3-mini", 200_000),
        ];
        for (id, cap) in rows {
            by_full_id.insert(id.to_string(), *cap);
            let model_name = id.split_once('/').map(|(_, n)| n).unwrap_or(id);
            by_model_name.insert(model_name.to_string(), *cap);
        }
        Self { by_full_id, by_model_name }
    }

    pub fn cap_for(&self, full_id: &str) -> u64 {
        if let Some(c) = self.by_full_id.get(full_id) {
            return *c;
        }
        let model_name = full_id.split_once('/').map(|(_, n)| n).unwrap_or(full_id);
        self.by_model_name.get(model_name).copied().unwrap_or(DEFAULT_INPUT_TOKEN_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_returns_its_own_cap() {
        let table = ContextWindowTable::default();
        assert_eq!(table.cap_for("anthropic/claude-opus-4-6"), 200_000);
    }

    #[test]
    fn unknown_model_falls_back_to_default() {
        let table = ContextWindowTable::default();
        assert_eq!(table.cap_for("some-provider/mystery-model"), DEFAULT_INPUT_TOKEN_CAP);
    }
}
