//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `SETTLEMENT_TIMEOUT_MS` — settlement validation deadline (default: `2000`)
/// - `WORKER_MAX_RETRIES` — retry budget per message (default: `3`)
/// - `LOG_PARTITIONS` — ordered-log partition count (default: `4`)
/// - `FRAUD_WORKERS` — fraud consumer concurrency (default: `4`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub settlement_timeout: Duration,
    pub worker_max_retries: u32,
    pub log_partitions: usize,
    pub fraud_workers: usize,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parsed("PORT", 3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            settlement_timeout: Duration::from_millis(env_parsed("SETTLEMENT_TIMEOUT_MS", 2000)),
            worker_max_retries: env_parsed("WORKER_MAX_RETRIES", 3),
            log_partitions: env_parsed("LOG_PARTITIONS", 4),
            fraud_workers: env_parsed("FRAUD_WORKERS", 4),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            settlement_timeout: Duration::from_millis(2000),
            worker_max_retries: 3,
            log_partitions: 4,
            fraud_workers: 4,
        }
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
