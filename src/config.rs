//! Configuration file parser for the aggregator.
//!
//! The config file is optional — a missing file yields `Config::default()`,
//! which serves empty (but valid) feeds until sources are configured.
//! Unknown keys are silently ignored by serde.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds the maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Title of the merged output feed.
    pub title: String,

    /// Home page URL advertised by the output feed.
    pub site_url: String,

    /// Description of the merged output feed.
    pub description: String,

    /// Ordered list of source feed URLs. Order matters: when the same item
    /// appears in several sources, the earliest-listed source wins.
    pub sources: Vec<String>,

    /// Minutes between refresh cycles.
    pub refresh_interval_minutes: u64,

    /// Listening port. The `PORT` environment variable takes precedence.
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Merged Feed".to_string(),
            site_url: "http://localhost".to_string(),
            description: "Aggregated feed".to_string(),
            sources: Vec::new(),
            refresh_interval_minutes: 15,
            port: 3000,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            sources = config.sources.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Effective listening port: `PORT` env var when set and parseable,
    /// the config value otherwise.
    pub fn effective_port(&self) -> u16 {
        match std::env::var("PORT") {
            Ok(raw) => match raw.parse::<u16>() {
                Ok(port) => port,
                Err(_) => {
                    tracing::warn!(value = %raw, "Ignoring unparseable PORT variable");
                    self.port
                }
            },
            Err(_) => self.port,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.refresh_interval_minutes, 15);
        assert_eq!(config.port, 3000);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/feedmerge_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.port, 3000);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_empty_file_returns_default() {
        let dir = std::env::temp_dir().join("feedmerge_config_test_empty");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.refresh_interval_minutes, 15);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let dir = std::env::temp_dir().join("feedmerge_config_test_partial");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "title = \"Planet Example\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.title, "Planet Example");
        assert_eq!(config.port, 3000); // default
        assert!(config.sources.is_empty()); // default

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let dir = std::env::temp_dir().join("feedmerge_config_test_full");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = r#"
title = "Planet Example"
site_url = "https://planet.example.com"
description = "All the blogs"
sources = [
    "https://a.example.com/rss.xml",
    "https://b.example.com/feed.json",
]
refresh_interval_minutes = 5
port = 8080
"#;
        std::fs::write(&path, content).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.title, "Planet Example");
        assert_eq!(config.site_url, "https://planet.example.com");
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0], "https://a.example.com/rss.xml");
        assert_eq!(config.refresh_interval_minutes, 5);
        assert_eq!(config.port, 8080);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let dir = std::env::temp_dir().join("feedmerge_config_test_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "this is not [valid toml").unwrap();

        let result = Config::load(&path);
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let dir = std::env::temp_dir().join("feedmerge_config_test_wrongtype");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        // sources should be an array, not a string
        std::fs::write(&path, "sources = \"https://example.com\"\n").unwrap();

        let result = Config::load(&path);
        assert!(result.is_err());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_port_env_override() {
        // Sole test touching PORT, so no cross-test interference
        let config = Config::default();
        assert_eq!(config.effective_port(), 3000);

        std::env::set_var("PORT", "8123");
        assert_eq!(config.effective_port(), 8123);

        std::env::set_var("PORT", "not-a-port");
        assert_eq!(config.effective_port(), 3000);

        std::env::remove_var("PORT");
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("feedmerge_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = "a".repeat(1_048_577);
        std::fs::write(&path, content).unwrap();

        let result = Config::load(&path);
        assert!(matches!(result.unwrap_err(), ConfigError::TooLarge(_)));

        std::fs::remove_dir_all(&dir).ok();
    }
}
