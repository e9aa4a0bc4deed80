use std::collections::HashMap;
use std::path::PathBuf;

/// The small bag of ambient state the orchestrator needs, threaded
/// explicitly instead of read from `std::env`/globals at arbitrary call
/// sites. Constructed once per process (CLI) or once per daemon start and
/// cloned (cheaply — everything here is `Arc`-friendly or `Copy`) into
/// every task that needs it.
#[derive(Clone)]
pub struct RuntimeContext {
    env: HashMap<String, String>,
    pub temp_dir: PathBuf,
    pub is_tty: bool,
}

impl RuntimeContext {
    /// Capture the process environment once. Callers that need isolation
    /// for tests should use `RuntimeContext::with_env` instead.
    pub fn from_process() -> Self {
        Self {
            env: std::env::vars().collect(),
            temp_dir: std::env::temp_dir(),
            is_tty: std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }

    pub fn with_env(env: HashMap<String, String>) -> Self {
        Self {
            env,
            temp_dir: std::env::temp_dir(),
            is_tty: false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    pub fn get_owned(&self, key: &str) -> Option<String> {
        self.env.get(key).cloned()
    }

    pub fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
