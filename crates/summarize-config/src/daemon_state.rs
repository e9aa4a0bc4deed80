//! `~/.summarize/daemon.json` (§6 "Persisted state layout"): the bearer
//! token and port the daemon was last started with, plus an install
//! timestamp. The one-shot CLI reads this to reach an already-running
//! daemon without the user re-entering a token.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use summarize_core::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonState {
    pub port: u16,
    pub token: String,
    pub installed_at_ms: i64,
}

impl DaemonState {
    /// Explicit path > `SUMMARIZE_DAEMON_STATE` env > `~/.summarize/daemon.json`.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("SUMMARIZE_DAEMON_STATE") {
            return PathBuf::from(p);
        }
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".summarize").join("daemon.json")
    }

    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)?;
        let state: Self = serde_json::from_str(&raw).map_err(|e| Error::Configuration {
            path: path.display().to_string(),
            reason: format!("invalid daemon state: {e}"),
        })?;
        Ok(Some(state))
    }

    /// Mint a fresh token and persist it, overwriting any prior state —
    /// called once per daemon process start.
    pub fn create(path: &Path, port: u16, now_ms: i64) -> Result<Self> {
        let state = Self { port, token: uuid::Uuid::new_v4().to_string(), installed_at_ms: now_ms };
        state.save(path)?;
        Ok(state)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}
