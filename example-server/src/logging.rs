//! Logging setup powered by tracing-subscriber

use crate::config::LoggingSettings;
use tracing_subscriber::EnvFilter;

/// Log format type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact text format: timestamp LEVEL target - message
    Compact,
    /// JSON Lines format for structured logging
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "json" | "jsonl" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Base level plus quieter defaults for chatty dependencies
fn build_env_filter(level: &str) -> anyhow::Result<EnvFilter> {
    let mut directives = vec![level.to_string()];

    let noisy: &[(&str, &str)] = &[("sqlx", "warn"), ("hyper", "warn"), ("h2", "warn")];
    for (target, noisy_level) in noisy {
        // an explicit directive for the same target wins
        if !level.contains(target) {
            directives.push(format!("{}={}", target, noisy_level));
        }
    }

    let filter = directives.join(",");
    EnvFilter::try_new(&filter).map_err(|e| anyhow::anyhow!("Invalid tracing filter '{}': {}", filter, e))
}

/// Install the global subscriber
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    let filter = build_env_filter(&settings.level)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let result = match LogFormat::parse(&settings.format) {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
