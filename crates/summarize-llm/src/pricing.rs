//! Per-1M-token USD pricing lookup (§4.1). Two-tier: an exact
//! `provider/model` key wins, falling back to the provider-less model
//! key. A model with no entry at either tier prices as `None`, not zero
//! — [`crate::costbook`] must not confuse "unpriced" with "free".

use std::collections::HashMap;
use summarize_core::ModelPrice;

pub struct PricingTable {
    by_full_id: HashMap<String, ModelPrice>,
    by_model_name: HashMap<String, ModelPrice>,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::built_in()
    }
}

impl PricingTable {
    /// Prices lifted from the providers' published per-1M-token rates.
    pub fn built_in() -> Self {
        let mut by_full_id = HashMap::new();
        let mut by_model_name = HashMap::new();

        let rows: &[(&str, f64, f64)] = &[
            ("anthropic/claude-opus-4-6", 15.00, 75.00),
            ("anthropic/claude-sonnet-4-20250514", 3.00, 15.00),
            ("anthropic/claude-haiku-3-5", 0.80, 4.00),
            ("openai/gpt-4o", 2.50, 10.00),
            ("openai/gpt-4o-mini", 0.15, 0.60),
            ("openai/gpt-4-turbo", 10.00, 30.00),
            ("openai/o1", 15.00, 60.00),
            ("openai/o1-mini", 3.00, 12.00),
            ("openai/o3", 10.00, 40.00),
            ("openai/o3-mini", 1.10, 4.40),
        ];
        for (id, input, output) in rows {
            let price = ModelPrice { input_usd_per_1m: *input, output_usd_per_1m: *output };
            by_full_id.insert(id.to_string(), price);
            let model_name = id.split_once('/').map(|(_, n)| n).unwrap_or(id);
            by_model_name.insert(model_name.to_string(), price);
        }

        Self { by_full_id, by_model_name }
    }

    pub fn insert(&mut self, full_id: &str, price: ModelPrice) {
        self.by_full_id.insert(full_id.to_string(), price);
        if let Some((_, name)) = full_id.split_once('/') {
            self.by_model_name.entry(name.to_string()).or_insert(price);
        }
    }

    /// Look up `provider/model`, falling back to `model` alone.
    pub fn lookup(&self, full_id: &str) -> Option<ModelPrice> {
        if let Some(p) = self.by_full_id.get(full_id) {
            return Some(*p);
        }
        let model_name = full_id.split_once('/').map(|(_, n)| n).unwrap_or(full_id);
        self.by_model_name.get(model_name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_id_wins_over_name_fallback() {
        let mut table = PricingTable::default();
        table.insert("openrouter/claude-opus-4-6", ModelPrice { input_usd_per_1m: 1.0, output_usd_per_1m: 2.0 });
        let exact = table.lookup("openrouter/claude-opus-4-6").unwrap();
        assert_eq!(exact.input_usd_per_1m, 1.0);
        // An unlisted provider for the same model name still falls back.
        let fallback = table.lookup("some-other-provider/claude-opus-4-6").unwrap();
        assert_eq!(fallback.input_usd_per_1m, 15.00);
    }

    #[test]
    fn unknown_model_returns_none_not_zero() {
        let table = PricingTable::default();
        assert!(table.lookup("anthropic/does-not-exist").is_none());
    }
}
