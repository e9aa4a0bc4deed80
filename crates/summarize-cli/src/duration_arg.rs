//! Parses the `--timeout` flag's `<30s|30|2m|5000ms>` shapes (§6).

use std::time::Duration;

pub fn parse_timeout(raw: &str) -> Result<Duration, String> {
    let trimmed = raw.trim();
    if let Some(ms) = trimmed.strip_suffix("ms") {
        return ms.parse::<u64>().map(Duration::from_millis).map_err(|_| format!("invalid timeout '{raw}'"));
    }
    if let Some(secs) = trimmed.strip_suffix('s') {
        return secs.parse::<u64>().map(Duration::from_secs).map_err(|_| format!("invalid timeout '{raw}'"));
    }
    if let Some(mins) = trimmed.strip_suffix('m') {
        return mins.parse::<u64>().map(|m| Duration::from_secs(m * 60)).map_err(|_| format!("invalid timeout '{raw}'"));
    }
    // Bare number: seconds.
    trimmed.parse::<u64>().map(Duration::from_secs).map_err(|_| format!("invalid timeout '{raw}'"))
}
