//! # summarize-config
//!
//! Layered JSON configuration for the summarize CLI and daemon (§6, §10.3).
//! Reads `~/.summarize/config.json`, applies environment overrides, and
//! validates before handing a `Config` snapshot to the rest of the
//! pipeline. Supports optional hot-reload via a filesystem watcher for the
//! daemon.

pub mod daemon_state;
pub mod loader;
pub mod schema;

pub use daemon_state::DaemonState;
pub use loader::ConfigLoader;
pub use schema::{
    CacheConfig, Config, MediaCacheConfig, ModelPreset, OpenAiConfig, PresetMode, PresetRule,
    ProviderConfig, RuleContext,
};
