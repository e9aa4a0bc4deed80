use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::duration_arg::parse_timeout;

/// Content summarization pipeline: URL/YouTube/file in, LLM summary or
/// extracted source out.
#[derive(Parser)]
#[command(name = "summarize", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// URL or file path to summarize. Omitted when running a subcommand.
    pub input: Option<String>,

    /// Path to config.json (default: ~/.summarize/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Model id (`provider/name`) or preset name (`auto`, `free`, ...)
    #[arg(long)]
    pub model: Option<String>,

    /// Target summary length
    #[arg(long, value_parser = ["short", "medium", "long", "xl", "xxl"])]
    pub length: Option<String>,

    /// Output language (name, code, or alias — resolved against the
    /// built-in language table)
    #[arg(long)]
    pub language: Option<String>,

    /// Streaming mode: print chunks as they arrive, buffer then print, or
    /// decide automatically from whether stdout is a TTY
    #[arg(long, value_parser = ["auto", "on", "off"], default_value = "auto")]
    pub stream: String,

    /// Render the summary as plain text or as markdown (with OSC-8
    /// hyperlinks on a TTY)
    #[arg(long, value_parser = ["plain", "markdown"], default_value = "plain")]
    pub render: String,

    /// Print the extracted source content instead of calling the model
    #[arg(long)]
    pub extract: bool,

    /// Alias for --extract that also skips slide extraction
    #[arg(long)]
    pub extract_only: bool,

    /// Emit the final result as a single JSON object on stdout
    #[arg(long)]
    pub json: bool,

    /// Cost/token metrics verbosity
    #[arg(long, value_parser = ["off", "on", "detailed"], default_value = "off")]
    pub metrics: String,

    /// Firecrawl extraction strategy
    #[arg(long, value_parser = ["off", "auto", "always"])]
    pub firecrawl: Option<String>,

    /// Markdown-conversion strategy for extracted HTML
    #[arg(long, value_parser = ["off", "auto", "llm"])]
    pub markdown: Option<String>,

    /// Per-request timeout, e.g. `30s`, `30`, `2m`, `5000ms`
    #[arg(long, value_parser = parse_timeout)]
    pub timeout: Option<std::time::Duration>,

    /// Cap on generated tokens for the summary call
    #[arg(long)]
    pub max_output_tokens: Option<u32>,

    /// Custom summarization prompt, replacing the built-in instruction
    #[arg(long)]
    pub prompt: Option<String>,

    /// Truncate extracted content to this many characters before
    /// summarizing
    #[arg(long)]
    pub max_characters: Option<u32>,

    /// Also extract representative slide images from an embedded/linked
    /// video
    #[arg(long)]
    pub slides: bool,

    /// Manual scene-cut threshold for slide detection (skips auto-tuning)
    #[arg(long)]
    pub slides_scene_threshold: Option<f32>,

    /// Run OCR over extracted slide images
    #[arg(long)]
    pub slides_ocr: bool,

    /// Disable the on-disk metadata cache for this invocation
    #[arg(long)]
    pub no_cache: bool,

    /// Disable the on-disk media (video/transcript) cache for this
    /// invocation
    #[arg(long)]
    pub no_media_cache: bool,

    /// Print cache occupancy and exit
    #[arg(long)]
    pub cache_stats: bool,

    /// Delete all cached entries and exit
    #[arg(long)]
    pub clear_cache: bool,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rank OpenRouter's `:free`-suffixed models and print the best
    /// surviving candidate (§4.9)
    RefreshFree {
        /// Additional probe runs per candidate beyond the first
        #[arg(long, default_value_t = 1)]
        runs: u32,
        /// Minimum parameter count (billions) a candidate must advertise
        #[arg(long, default_value_t = 27.0)]
        min_params: f64,
        /// Reject candidates older than this many days (0 = no limit)
        #[arg(long, default_value_t = 180)]
        max_age_days: u32,
        /// Log each probe attempt
        #[arg(long)]
        verbose: bool,
    },
    /// Run the summarize pipeline as a local HTTP daemon (§4.8)
    Daemon {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:4756")]
        listen: String,
    },
}
