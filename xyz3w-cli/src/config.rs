//! Environment-derived CLI configuration, the same shape as the teacher's
//! `Config::from_env()` (default bind address, timeouts) generalized to a
//! serial session. `command_timeout`/`upload_timeout`/`poll_interval` are
//! threaded into `Session::connect_with_timeouts` and `upload_file_with_timeout`
//! as overrides of the protocol's default 5s/30s/4s values, not replacements
//! for them.

use std::time::Duration;

/// Knobs an operator can override without touching a subcommand's flags.
#[derive(Debug, Clone)]
pub struct Config {
    pub default_port: Option<String>,
    pub default_model: String,
    pub command_timeout: Duration,
    pub upload_timeout: Duration,
    pub poll_interval: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            default_port: std::env::var("XYZ3W_PORT").ok(),
            default_model: std::env::var("XYZ3W_MODEL").unwrap_or_else(|_| "dv1MX0A000".to_string()),
            command_timeout: parse_secs_env("XYZ3W_COMMAND_TIMEOUT_SECS", 5),
            upload_timeout: parse_secs_env("XYZ3W_UPLOAD_TIMEOUT_SECS", 30),
            poll_interval: parse_secs_env("XYZ3W_POLL_INTERVAL_SECS", 4),
        }
    }
}

fn parse_secs_env(key: &str, default_secs: u64) -> Duration {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).map(Duration::from_secs).unwrap_or(Duration::from_secs(default_secs))
}
