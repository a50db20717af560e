//! Configuration management for the facet engine
//!
//! TOML file support, `FACETS_*` environment variable overrides and
//! defaults matching the engine's production constants.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct EngineConfig {
    /// Stacking (drill-down) fan-out settings
    #[serde(default)]
    pub stack: StackConfig,

    /// Paging limits
    #[serde(default)]
    pub paging: PagingConfig,

    /// Identity cache settings
    #[serde(default)]
    pub identity: IdentityConfig,

    /// List endpoint settings
    #[serde(default)]
    pub list: ListConfig,

    /// Search backend connection
    #[serde(default)]
    pub backend: BackendConfig,

    /// Relational store connection
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Stack executor configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StackConfig {
    /// Worker threads in the per-call stacking pool
    #[serde(default = "default_stack_parallelism")]
    pub parallelism: usize,

    /// Parent bucket count above which Top-N capping engages
    #[serde(default = "default_stack_count_threshold")]
    pub count_threshold: usize,

    /// Parent buckets kept after capping (half top, half bottom)
    #[serde(default = "default_stack_top_n")]
    pub top_n: usize,
}

/// Paging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PagingConfig {
    /// Upper bound for a single page / bucket window
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Page size used when the caller does not pass one
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
}

/// Identity cache configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct IdentityConfig {
    /// Number of tenants whose identity maps stay resident
    #[serde(default = "default_identity_capacity")]
    pub cache_capacity: usize,
}

/// List endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ListConfig {
    /// Days before now that separate "refactored" from "legacy" lines
    #[serde(default = "default_legacy_window_days")]
    pub legacy_window_days: i64,
}

/// Search backend configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BackendConfig {
    /// Base URL of the search cluster
    #[serde(default = "default_backend_url")]
    pub url: String,

    /// Request timeout in seconds (the engine has no timeout of its own)
    #[serde(default = "default_backend_timeout_secs")]
    pub timeout_secs: u64,
}

/// Relational store configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StoreConfig {
    /// SQLite database path
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Include the event target in log lines
    #[serde(default = "default_true")]
    pub with_target: bool,
}

// Default value functions
fn default_stack_parallelism() -> usize { 30 }
fn default_stack_count_threshold() -> usize { 50 }
fn default_stack_top_n() -> usize { 30 }
fn default_max_page_size() -> usize { 1000 }
fn default_page_size() -> usize { 100 }
fn default_identity_capacity() -> usize { 250 }
fn default_legacy_window_days() -> i64 { 60 }
fn default_backend_url() -> String { "http://localhost:9200".to_string() }
fn default_backend_timeout_secs() -> u64 { 30 }
fn default_sqlite_path() -> PathBuf { PathBuf::from("facets.sqlite") }
fn default_log_level() -> String { "info".to_string() }
fn default_true() -> bool { true }

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            parallelism: default_stack_parallelism(),
            count_threshold: default_stack_count_threshold(),
            top_n: default_stack_top_n(),
        }
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            max_page_size: default_max_page_size(),
            default_page_size: default_page_size(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_identity_capacity(),
        }
    }
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            legacy_window_days: default_legacy_window_days(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            timeout_secs: default_backend_timeout_secs(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sqlite_path: default_sqlite_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: true,
        }
    }
}

impl StackConfig {
    /// Set the worker count of the stacking pool
    pub fn with_parallelism(mut self, n: usize) -> Self {
        self.parallelism = n.max(1);
        self
    }

    /// Set the capping threshold and the number of buckets kept
    pub fn with_capping(mut self, count_threshold: usize, top_n: usize) -> Self {
        self.count_threshold = count_threshold;
        self.top_n = top_n;
        self
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path, e))?;

        Self::from_toml_str(&contents)
            .map_err(|e| format!("Failed to parse config file {}: {}", path, e))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| e.to_string())
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file_with_env(path: &str) -> Result<Self, String> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from `FACETS_CONFIG` when set, otherwise defaults; then apply overrides
    pub fn from_env() -> Result<Self, String> {
        match std::env::var("FACETS_CONFIG") {
            Ok(path) => Self::from_file_with_env(&path),
            Err(_) => {
                let mut config = Self::default();
                config.apply_env_overrides();
                Ok(config)
            }
        }
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        // Stacking
        if let Some(n) = env_parse("FACETS_STACK_PARALLELISM") {
            self.stack.parallelism = n;
        }
        if let Some(n) = env_parse("FACETS_STACK_COUNT_THRESHOLD") {
            self.stack.count_threshold = n;
        }
        if let Some(n) = env_parse("FACETS_STACK_TOP_N") {
            self.stack.top_n = n;
        }

        // Paging and caching
        if let Some(n) = env_parse("FACETS_MAX_PAGE_SIZE") {
            self.paging.max_page_size = n;
        }
        if let Some(n) = env_parse("FACETS_IDENTITY_CACHE_CAPACITY") {
            self.identity.cache_capacity = n;
        }

        // Connections
        if let Ok(url) = std::env::var("FACETS_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Some(secs) = env_parse("FACETS_BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = secs;
        }
        if let Ok(path) = std::env::var("FACETS_STORE_PATH") {
            self.store.sqlite_path = PathBuf::from(path);
        }

        // Logging
        if let Ok(level) = std::env::var("FACETS_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.stack.parallelism == 0 {
            return Err("Stack parallelism must be > 0".to_string());
        }
        if self.stack.top_n < 2 {
            return Err("Stack top_n must keep at least 2 buckets".to_string());
        }
        if self.stack.top_n > self.stack.count_threshold {
            return Err(format!(
                "Stack top_n ({}) cannot exceed count_threshold ({})",
                self.stack.top_n, self.stack.count_threshold
            ));
        }
        if self.paging.max_page_size == 0 || self.paging.default_page_size == 0 {
            return Err("Page sizes must be > 0".to_string());
        }
        if self.paging.default_page_size > self.paging.max_page_size {
            return Err("Default page size cannot exceed max page size".to_string());
        }
        if self.identity.cache_capacity == 0 {
            return Err("Identity cache capacity must be > 0".to_string());
        }
        if self.list.legacy_window_days < 0 {
            return Err("Legacy window cannot be negative".to_string());
        }
        if self.backend.url.is_empty() {
            return Err("Backend URL cannot be empty".to_string());
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &str) -> Result<(), String> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(path, contents)
            .map_err(|e| format!("Failed to write config file {}: {}", path, e))
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.stack.parallelism, 30);
        assert_eq!(config.stack.count_threshold, 50);
        assert_eq!(config.stack.top_n, 30);
        assert_eq!(config.paging.max_page_size, 1000);
        assert_eq!(config.identity.cache_capacity, 250);
        assert_eq!(config.list.legacy_window_days, 60);
    }

    #[test]
    fn test_config_validation() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_top_n() {
        let mut config = EngineConfig::default();
        config.stack.top_n = 80;
        assert!(config.validate().is_err());

        config.stack.top_n = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [stack]
            parallelism = 4

            [backend]
            url = "http://search:9200"
            "#,
        )
        .unwrap();
        assert_eq!(config.stack.parallelism, 4);
        assert_eq!(config.stack.top_n, 30);
        assert_eq!(config.backend.url, "http://search:9200");
        assert_eq!(config.backend.timeout_secs, 30);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facets.toml");
        let path = path.to_str().unwrap();

        let config = EngineConfig {
            stack: StackConfig::default().with_parallelism(8),
            ..Default::default()
        };
        config.save_to_file(path).unwrap();

        let loaded = EngineConfig::from_file(path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("FACETS_STACK_PARALLELISM", "12");
        let mut config = EngineConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.stack.parallelism, 12);
        std::env::remove_var("FACETS_STACK_PARALLELISM");
    }
}
