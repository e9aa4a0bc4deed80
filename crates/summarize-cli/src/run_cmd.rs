//! The one-shot `summarize <url|path>` invocation (§4.7, §6).

use std::io::IsTerminal;
use summarize_config::RuleContext;
use summarize_core::{Error, ExtractSettings, ExtractedContent, FirecrawlMode, InputTarget, MarkdownMode, Result, SummaryLength, UrlKind};
use summarize_run::{Orchestrator, RunOptions};

use crate::cli::Cli;
use crate::render;
use crate::setup::BuiltPipeline;

fn classify_rule_context(url: &str) -> RuleContext {
    let is_youtube = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .map(|host| host.ends_with("youtube.com") || host.ends_with("youtu.be"))
        .unwrap_or(false);
    if is_youtube {
        RuleContext::Youtube
    } else {
        match UrlKind::classify(url) {
            UrlKind::Asset => RuleContext::Asset,
            UrlKind::Website => RuleContext::Website,
        }
    }
}

fn parse_extract_settings(cli: &Cli) -> Result<ExtractSettings> {
    let firecrawl = match cli.firecrawl.as_deref() {
        Some("off") => FirecrawlMode::Off,
        Some("auto") | None => FirecrawlMode::Auto,
        Some("always") => FirecrawlMode::Always,
        Some(other) => return Err(Error::InputValidation(format!("unknown --firecrawl value '{other}'"))),
    };
    let markdown = match cli.markdown.as_deref() {
        Some("off") | None => MarkdownMode::Off,
        Some("auto") => MarkdownMode::Auto,
        Some("llm") => MarkdownMode::Llm,
        Some(other) => return Err(Error::InputValidation(format!("unknown --markdown value '{other}'"))),
    };
    Ok(ExtractSettings { firecrawl, markdown })
}

fn build_run_options(cli: &Cli, rule_context: RuleContext) -> Result<RunOptions> {
    let length = match cli.length.as_deref() {
        Some(raw) => SummaryLength::parse(raw).ok_or_else(|| Error::InputValidation(format!("unknown --length value '{raw}'")))?,
        None => SummaryLength::default(),
    };
    Ok(RunOptions {
        model_or_preset: cli.model.clone().unwrap_or_else(|| "auto".to_string()),
        length,
        language: cli.language.clone().unwrap_or_else(|| "en".to_string()),
        rule_context,
        extract_settings: parse_extract_settings(cli)?,
        extract_only: cli.extract || cli.extract_only,
        prompt: cli.prompt.clone(),
        max_characters: cli.max_characters,
        max_output_tokens: cli.max_output_tokens.unwrap_or(1024),
        slides: cli.slides,
        slides_scene_threshold: cli.slides_scene_threshold,
        slides_ocr: cli.slides_ocr,
    })
}

pub async fn run(cli: &Cli, pipeline: &BuiltPipeline) -> Result<()> {
    let input = cli.input.as_deref().ok_or_else(|| Error::InputValidation("no URL or file path given".to_string()))?;
    let target = InputTarget::parse(input)?;

    let outcome = match &target {
        InputTarget::Url { payload } => {
            let options = build_run_options(cli, classify_rule_context(payload))?;
            pipeline.orchestrator.run(None, None, payload, &options).await?
        }
        InputTarget::File { payload } => {
            let options = build_run_options(cli, RuleContext::Website)?;
            let extracted = extracted_content_from_file(payload)?;
            pipeline.orchestrator.run_with_content(None, None, extracted, &options).await?
        }
    };

    print_outcome(cli, &pipeline.orchestrator, &outcome).await;
    Ok(())
}

fn extracted_content_from_file(path: &std::path::Path) -> Result<ExtractedContent> {
    if !path.exists() {
        return Err(Error::InputValidation(format!("file not found: {}", path.display())));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(ExtractedContent {
        url: format!("file://{}", path.display()),
        title: path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default(),
        description: None,
        site_name: None,
        total_characters: content.chars().count(),
        word_count: content.split_whitespace().count(),
        content,
        truncated: false,
        transcript: None,
        video: None,
        is_video_only: false,
        diagnostics: Vec::new(),
    })
}

async fn print_outcome(cli: &Cli, orchestrator: &Orchestrator, outcome: &summarize_run::RunOutcome) {
    let is_tty = std::io::stdout().is_terminal();

    if cli.json {
        let body = serde_json::json!({
            "url": outcome.extracted.url,
            "title": outcome.extracted.title,
            "summary": outcome.summary,
            "modelUsed": outcome.model_used,
            "extracted": cli.extract || cli.extract_only,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else if cli.extract || cli.extract_only {
        println!("{}", outcome.extracted.content);
    } else if let Some(summary) = &outcome.summary {
        let text = if cli.render == "markdown" { render::render_markdown(summary, is_tty) } else { summary.clone() };
        println!("{text}");
    }

    if cli.metrics != "off" && !outcome.cost_book.is_empty() {
        let pricing = orchestrator.model_registry.pricing();
        for group in outcome.cost_book.group_totals(pricing) {
            if cli.metrics == "detailed" {
                eprintln!(
                    "{}/{}: calls={} prompt={:?} completion={:?} total={:?} {}",
                    group.provider,
                    group.model,
                    group.calls,
                    group.prompt_tokens.get(),
                    group.completion_tokens.get(),
                    group.total_tokens.get(),
                    summarize_llm::render_cost(group.cost_usd)
                );
            } else {
                eprintln!("{}/{}: {}", group.provider, group.model, summarize_llm::render_cost(group.cost_usd));
            }
        }
    }
}
