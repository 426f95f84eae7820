//! Simple time helpers used by multiple stages.

use std::time::{SystemTime, UNIX_EPOCH};

/// Format of the per-run working directory name.
pub const RUN_ID_FORMAT: &str = "%m%d%Y__%H%M%S";

/// Current timestamp in milliseconds since the Unix epoch.
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// Run identifier derived from the current UTC wall clock.
pub fn run_id() -> String {
    chrono::Utc::now().format(RUN_ID_FORMAT).to_string()
}
