use notify::{Event as NotifyEvent, EventKind, RecursiveMode, Watcher};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use summarize_core::{Error, Result};
use tracing::{info, warn};

use crate::schema::Config;

/// Loads and optionally hot-reloads `~/.summarize/config.json`.
///
/// Precedence for most fields is `CLI flag > env > config file > built-in
/// default` (§6). API keys are the deliberate exception: a value already
/// present in the config file wins over the like-named environment
/// variable, so a checked-in config can't be silently shadowed by a leaked
/// shell export (§10.3).
pub struct ConfigLoader {
    config: Arc<RwLock<Config>>,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit `--config` > `SUMMARIZE_CONFIG`
    /// env > `~/.summarize/config.json`.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("SUMMARIZE_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".summarize")
            .join("config.json")
    }

    /// Load the config from disk, defaulting to an empty object when the
    /// file is absent. A non-object top-level JSON value is a
    /// `Configuration` error naming the file path; a malformed config
    /// never silently falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = Self::read_and_parse(&config_path)?;
        let config = Self::apply_env_overrides(config);

        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w.0);
                }
            }
            Err(e) => {
                return Err(Error::Configuration {
                    path: config_path.display().to_string(),
                    reason: e,
                });
            }
        }

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    fn read_and_parse(config_path: &Path) -> Result<Config> {
        if !config_path.exists() {
            info!(?config_path, "config file not found, using defaults");
            return Ok(Config::default());
        }
        info!(?config_path, "loading configuration");
        let raw = std::fs::read_to_string(config_path)?;
        let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| Error::Configuration {
            path: config_path.display().to_string(),
            reason: format!("invalid JSON: {e}"),
        })?;
        if !value.is_object() {
            return Err(Error::Configuration {
                path: config_path.display().to_string(),
                reason: "top-level value must be a JSON object".to_string(),
            });
        }
        serde_json::from_value(value).map_err(|e| Error::Configuration {
            path: config_path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Get a read snapshot of the current config.
    pub fn get(&self) -> Config {
        self.config.read().clone()
    }

    /// Get a shared reference for subscription (the daemon holds this
    /// across the hot-reload watcher's lifetime).
    pub fn shared(&self) -> Arc<RwLock<Config>> {
        Arc::clone(&self.config)
    }

    /// Path being watched.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply environment-variable overrides that affect config *values*
    /// directly (API keys). Provider base-URL env vars and CLI flags are
    /// resolved at the call site instead (`resolve_base_url`) because they
    /// outrank the config file rather than fill gaps in it.
    fn apply_env_overrides(config: Config) -> Config {
        config
    }

    /// Precedence chain for a provider base URL (§4.1, §6): CLI flag >
    /// provider-specific env var > config file value.
    pub fn resolve_base_url(cli_flag: Option<&str>, env_var: &str, config_value: Option<&str>) -> Option<String> {
        cli_flag
            .map(str::to_string)
            .or_else(|| std::env::var(env_var).ok())
            .or_else(|| config_value.map(str::to_string))
    }

    /// Precedence chain for an API key (§10.3): the config file value wins
    /// over the like-named environment variable — the opposite order from
    /// `resolve_base_url`.
    pub fn resolve_api_key(config_value: Option<&str>, env_var: &str) -> Option<String> {
        config_value.map(str::to_string).or_else(|| std::env::var(env_var).ok())
    }

    /// Reload the config from disk, replacing the shared snapshot.
    pub fn reload(&self) -> Result<()> {
        let new_config = Self::read_and_parse(&self.config_path)?;
        let new_config = Self::apply_env_overrides(new_config);
        *self.config.write() = new_config;
        info!("configuration reloaded");
        Ok(())
    }

    /// Start a background file watcher that triggers `reload()` when the
    /// config file changes. The daemon keeps this alive for its process
    /// lifetime; the one-shot CLI never calls this.
    pub fn watch(&self) -> Result<notify::RecommendedWatcher> {
        let config = Arc::clone(&self.config);
        let config_path = self.config_path.clone();

        info!(?config_path, "starting config file watcher");

        let path_for_event = config_path.clone();
        let mut watcher = notify::recommended_watcher(move |res: std::result::Result<NotifyEvent, notify::Error>| {
            match res {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        return;
                    }
                    let is_our_file = event.paths.iter().any(|p| p.file_name() == path_for_event.file_name());
                    if !is_our_file {
                        return;
                    }
                    info!("config file changed, reloading");
                    match ConfigLoader::read_and_parse(&path_for_event) {
                        Ok(new_config) => {
                            let new_config = ConfigLoader::apply_env_overrides(new_config);
                            *config.write() = new_config;
                            info!("configuration hot-reloaded successfully");
                        }
                        Err(e) => warn!(error = %e, "config file has errors, keeping current config"),
                    }
                }
                Err(e) => warn!(error = %e, "file watcher error"),
            }
        })
        .map_err(|e| Error::Other(format!("failed to create file watcher: {e}")))?;

        let watch_path = self.config_path.parent().unwrap_or(Path::new("."));
        watcher
            .watch(watch_path, RecursiveMode::NonRecursive)
            .map_err(|e| Error::Other(format!("failed to watch config directory: {e}")))?;

        Ok(watcher)
    }
}
