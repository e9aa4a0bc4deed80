//! Command-line front-end for the summarize pipeline (§6).
//!
//! `summarize <url|path>` runs the one-shot flow; `summarize daemon`
//! starts the long-running HTTP server; `summarize refresh-free` ranks
//! OpenRouter's free-tier catalog.

mod cli;
mod daemon_cmd;
mod duration_arg;
mod refresh_free;
mod render;
mod run_cmd;
mod setup;

pub use cli::Cli;

use summarize_core::Result;

impl Cli {
    pub async fn run_cli(self) -> Result<()> {
        init_tracing(self.log_level.as_deref());

        let loader = setup::load_config(self.config.as_deref())?;
        let config = loader.get();

        match &self.command {
            Some(cli::Commands::RefreshFree { runs, min_params, max_age_days, verbose }) => {
                return refresh_free::run(*runs, *min_params, *max_age_days, *verbose).await;
            }
            Some(cli::Commands::Daemon { listen }) => {
                let pipeline = setup::build_pipeline(setup::SetupOptions {
                    config,
                    timeout: self.timeout.unwrap_or_else(setup::default_timeout),
                    no_cache: self.no_cache,
                    no_media_cache: self.no_media_cache,
                    base_url_flag: None,
                })?;
                return daemon_cmd::run(listen, pipeline).await;
            }
            None => {}
        }

        let pipeline = setup::build_pipeline(setup::SetupOptions {
            config,
            timeout: self.timeout.unwrap_or_else(setup::default_timeout),
            no_cache: self.no_cache,
            no_media_cache: self.no_media_cache,
            base_url_flag: None,
        })?;

        if self.cache_stats {
            print_cache_stats(&pipeline);
            return Ok(());
        }
        if self.clear_cache {
            clear_caches(&pipeline)?;
            return Ok(());
        }

        run_cmd::run(&self, &pipeline).await
    }
}

fn print_cache_stats(pipeline: &setup::BuiltPipeline) {
    if let Ok(stats) = pipeline.orchestrator.content_cache.stats() {
        println!("metadata cache: {} entries, {} bytes", stats.entries, stats.total_bytes);
    }
    let (entries, bytes) = pipeline.orchestrator.extractor.media_cache().stats();
    println!("media cache: {entries} entries, {bytes} bytes");
}

fn clear_caches(pipeline: &setup::BuiltPipeline) -> Result<()> {
    let metadata_cleared = pipeline.orchestrator.content_cache.clear()?;
    let media_cleared = pipeline.orchestrator.extractor.media_cache().clear()?;
    println!("cleared {metadata_cleared} metadata entries, {media_cleared} media entries");
    Ok(())
}

fn init_tracing(log_level: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let format_json = std::env::var("SUMMARIZE_LOG_FORMAT").map(|v| v == "json").unwrap_or(false);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    if format_json {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).json().with_target(true).try_init();
    } else {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
    }
}
