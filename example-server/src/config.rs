//! Server configuration
//!
//! Loaded from an optional TOML file, then overridden from the environment,
//! then validated. Every field has a default, so the server runs without a
//! file.

use axum_table_editor::{AccessRules, Role, DEFAULT_PAGE_SIZE};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub const ENV_DATABASE_URL: &str = "TABLE_EDITOR_DATABASE_URL";
pub const ENV_BIND: &str = "TABLE_EDITOR_BIND";
pub const ENV_LOG: &str = "TABLE_EDITOR_LOG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub browser: BrowserSettings,
    pub logging: LoggingSettings,
    pub auth: AuthSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address to listen on
    pub bind: String,

    /// Prefix in front of `/api`; empty serves `/api/tables/...`
    pub base_path: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            base_path: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// `sqlite:...` or `postgres://...`
    pub url: String,

    /// PostgreSQL schema whose tables are exposed
    pub schema: String,

    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
    pub idle_timeout_ms: u64,

    /// Create and fill the demo tables on startup (SQLite only)
    pub seed_sample_data: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite:./data/example.db?mode=rwc".to_string(),
            schema: "public".to_string(),
            max_connections: 20,
            acquire_timeout_ms: 2_000,
            idle_timeout_ms: 30_000,
            seed_sample_data: true,
        }
    }
}

impl DatabaseSettings {
    pub fn is_postgres(&self) -> bool {
        self.url.starts_with("postgres://") || self.url.starts_with("postgresql://")
    }

    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Maximum rows per export; unset means unlimited
    pub export_limit: Option<u64>,

    /// Tables with this prefix are hidden; empty hides nothing
    pub hidden_table_prefix: String,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            export_limit: Some(100_000),
            hidden_table_prefix: axum_table_editor::identifier::DEFAULT_HIDDEN_PREFIX.to_string(),
        }
    }
}

impl BrowserSettings {
    pub fn hidden_prefix(&self) -> Option<String> {
        (!self.hidden_table_prefix.is_empty()).then(|| self.hidden_table_prefix.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Base level or a full `EnvFilter` directive list
    pub level: String,

    /// `compact` or `json`
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Role needed for GET requests; unset leaves reads open
    pub read_role: Option<Role>,

    /// Role needed for writes; unset leaves writes open
    pub write_role: Option<Role>,

    pub tokens: Vec<TokenEntry>,
}

impl AuthSettings {
    pub fn is_enabled(&self) -> bool {
        self.read_role.is_some() || self.write_role.is_some()
    }

    pub fn rules(&self) -> AccessRules {
        AccessRules {
            read: self.read_role,
            write: self.write_role,
        }
    }
}

/// A static API token
#[derive(Debug, Clone, Deserialize)]
pub struct TokenEntry {
    pub token: String,
    pub user_id: i64,
    pub role: Role,
}

impl ServerConfig {
    /// Load configuration from a TOML file
    ///
    /// Note: Environment overrides are applied separately via `apply_env_overrides()`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.as_ref().display(), e))?;

        toml::from_str(&content).map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))
    }

    /// File (if any), then environment, then validation
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Override settings from environment variables, read through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_DATABASE_URL) {
            self.database.url = url;
        }
        if let Some(bind) = lookup(ENV_BIND) {
            self.server.bind = bind;
        }
        if let Some(level) = lookup(ENV_LOG) {
            self.logging.level = level;
        }
    }

    pub fn bind_address(&self) -> anyhow::Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", self.server.bind, e))
    }

    /// Validate configuration settings
    pub fn validate(&self) -> anyhow::Result<()> {
        self.bind_address()?;

        let base_path = &self.server.base_path;
        if !base_path.is_empty() && !base_path.starts_with('/') {
            return Err(anyhow::anyhow!(
                "base_path '{}' must be empty or start with '/'",
                base_path
            ));
        }

        if !self.database.is_sqlite() && !self.database.is_postgres() {
            return Err(anyhow::anyhow!(
                "Unsupported database url '{}'. Use sqlite:... or postgres://...",
                self.database.url
            ));
        }
        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("max_connections cannot be 0"));
        }
        if self.database.acquire_timeout_ms == 0 {
            return Err(anyhow::anyhow!("acquire_timeout_ms cannot be 0"));
        }
        if self.database.schema.trim().is_empty() {
            return Err(anyhow::anyhow!("database schema cannot be empty"));
        }

        if let Some(limit) = self.browser.export_limit {
            if limit < DEFAULT_PAGE_SIZE {
                return Err(anyhow::anyhow!(
                    "export_limit ({}) cannot be smaller than a page ({})",
                    limit,
                    DEFAULT_PAGE_SIZE
                ));
            }
        }

        let valid_formats = ["compact", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_formats.join(", ")
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(anyhow::anyhow!("log level cannot be empty"));
        }

        if self.auth.is_enabled() && self.auth.tokens.is_empty() {
            return Err(anyhow::anyhow!("auth roles are configured but no tokens are defined"));
        }
        let mut seen = HashSet::new();
        for entry in &self.auth.tokens {
            if entry.token.trim().is_empty() {
                return Err(anyhow::anyhow!("auth token for user {} is empty", entry.user_id));
            }
            if !seen.insert(entry.token.as_str()) {
                return Err(anyhow::anyhow!("duplicate auth token for user {}", entry.user_id));
            }
        }

        Ok(())
    }
}
