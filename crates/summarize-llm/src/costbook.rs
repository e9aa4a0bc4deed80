//! Run-scoped cost bookkeeping (§4.2). An append-only log of [`LlmCall`]s
//! plus ad-hoc auxiliary-service counters (transcription minutes, OCR
//! pages, …), grouped and summed at report time with strict null
//! preservation: a column sums to `null` iff nothing contributed a real
//! number, never to zero.

use std::collections::HashMap;
use summarize_core::{LlmCall, ModelPrice};

use crate::pricing::PricingTable;

#[derive(Debug, Clone, Copy, Default)]
pub struct NullableSum {
    total: Option<u64>,
}

impl NullableSum {
    fn add(&mut self, value: Option<u64>) {
        if let Some(v) = value {
            self.total = Some(self.total.unwrap_or(0) + v);
        }
    }

    pub fn get(&self) -> Option<u64> {
        self.total
    }
}

#[derive(Debug, Clone, Default)]
pub struct GroupTotals {
    pub provider: String,
    pub model: String,
    pub calls: u32,
    pub prompt_tokens: NullableSum,
    pub completion_tokens: NullableSum,
    pub total_tokens: NullableSum,
    pub cost_usd: Option<f64>,
}

#[derive(Debug, Default)]
pub struct CostBook {
    calls: Vec<LlmCall>,
    /// Non-LLM service counters, e.g. `"transcription_minutes"`,
    /// `"ocr_pages"`. Always contributes a real (non-null) number once
    /// incremented.
    auxiliary: HashMap<String, f64>,
}

impl CostBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, call: LlmCall) {
        self.calls.push(call);
    }

    pub fn record_auxiliary(&mut self, service: &str, amount: f64) {
        *self.auxiliary.entry(service.to_string()).or_insert(0.0) += amount;
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.auxiliary.is_empty()
    }

    /// Group calls by `(provider, model)`, summing token usage with
    /// null preservation and pricing each group from `pricing`.
    pub fn group_totals(&self, pricing: &PricingTable) -> Vec<GroupTotals> {
        let mut groups: HashMap<(String, String), GroupTotals> = HashMap::new();
        for call in &self.calls {
            let key = (call.provider.clone(), call.model.clone());
            let entry = groups.entry(key).or_insert_with(|| GroupTotals {
                provider: call.provider.clone(),
                model: call.model.clone(),
                ..Default::default()
            });
            entry.calls += 1;
            entry.prompt_tokens.add(call.usage.prompt);
            entry.completion_tokens.add(call.usage.completion);
            entry.total_tokens.add(call.usage.total);
        }

        let full_id = |g: &GroupTotals| format!("{}/{}", g.provider, g.model);
        let mut rows: Vec<GroupTotals> = groups.into_values().collect();
        for row in &mut rows {
            let id = full_id(row);
            row.cost_usd = pricing
                .lookup(&id)
                .map(|price| row_cost(row.prompt_tokens.get(), row.completion_tokens.get(), price));
        }
        rows.sort_by(|a, b| (a.provider.clone(), a.model.clone()).cmp(&(b.provider.clone(), b.model.clone())));
        rows
    }

    /// `None` unless at least one LLM row or auxiliary service
    /// contributed a priced/costed amount.
    pub fn total_cost_usd(&self, pricing: &PricingTable) -> Option<f64> {
        let rows = self.group_totals(pricing);
        let mut total = None;
        for row in &rows {
            if let Some(c) = row.cost_usd {
                total = Some(total.unwrap_or(0.0) + c);
            }
        }
        total
    }

    pub fn auxiliary_totals(&self) -> &HashMap<String, f64> {
        &self.auxiliary
    }
}

fn row_cost(prompt: Option<u64>, completion: Option<u64>, price: ModelPrice) -> f64 {
    let input = prompt.unwrap_or(0) as f64 / 1_000_000.0 * price.input_usd_per_1m;
    let output = completion.unwrap_or(0) as f64 / 1_000_000.0 * price.output_usd_per_1m;
    input + output
}

/// Render a cost for the "Finished" line (§4.2): never more than 2
/// decimals, and a positive-but-sub-cent amount prints as `<$0.01`
/// rather than rounding down to `$0.00`.
pub fn render_cost(cost: Option<f64>) -> String {
    match cost {
        None => "cost=n/a".to_string(),
        Some(c) if c > 0.0 && c < 0.005 => "cost=<$0.01".to_string(),
        Some(c) => format!("cost=${c:.2}"),
    }
}
