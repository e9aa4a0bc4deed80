use summarize_config::{Config, ModelPreset, PresetMode, PresetRule, RuleContext};
use summarize_core::{CallPurpose, LlmCall, Usage};
use summarize_llm::mock::MockProvider;
use summarize_llm::{CostBook, GenerateRequest, LlmProvider, ModelId, ModelRegistry, PricingTable, render_cost};

#[test]
fn model_id_parses_provider_and_name() {
    let id = ModelId::parse("anthropic/claude-opus-4-6").unwrap();
    assert_eq!(id.provider, "anthropic");
    assert_eq!(id.name, "claude-opus-4-6");
}

#[test]
fn preset_resolution_respects_context_specific_rules() {
    let mut config = Config::default();
    config.models.insert(
        "team-default".to_string(),
        ModelPreset {
            mode: PresetMode::Auto,
            rules: vec![
                PresetRule { when: Some(vec![RuleContext::Asset]), candidates: vec!["openai/whisper-relay".into()] },
                PresetRule { when: None, candidates: vec!["anthropic/claude-opus-4-6".into()] },
            ],
        },
    );
    let registry = ModelRegistry::new(config);
    assert_eq!(registry.candidates("team-default", RuleContext::Asset), vec!["openai/whisper-relay"]);
    assert_eq!(registry.candidates("team-default", RuleContext::Website), vec!["anthropic/claude-opus-4-6"]);
}

#[tokio::test]
async fn mock_provider_round_trips_generate_request() {
    let provider = MockProvider::new("mock").with_response("a short summary");
    let req = GenerateRequest {
        model: "test".into(),
        messages: vec![],
        system: Some("summarize concisely".into()),
        max_tokens: 256,
        temperature: 0.3,
    };
    let resp = provider.generate(&req).await.unwrap();
    assert_eq!(resp.text, "a short summary");
}

#[test]
fn costbook_totals_null_propagate_until_a_priced_model_contributes() {
    let mut book = CostBook::new();
    book.record(LlmCall {
        provider: "local".into(),
        model: "unpriced-model".into(),
        usage: Usage { prompt: Some(10), completion: Some(5), total: None },
        purpose: CallPurpose::Summary,
    });
    let pricing = PricingTable::default();
    assert_eq!(book.total_cost_usd(&pricing), None);

    book.record(LlmCall {
        provider: "anthropic".into(),
        model: "claude-opus-4-6".into(),
        usage: Usage { prompt: Some(1_000_000), completion: Some(1_000_000), total: None },
        purpose: CallPurpose::Summary,
    });
    let total = book.total_cost_usd(&pricing).unwrap();
    assert!((total - 90.0).abs() < 1e-6);
}

#[test]
fn render_cost_never_exceeds_two_decimals() {
    assert_eq!(render_cost(Some(12.3456)), "cost=$12.35");
}
