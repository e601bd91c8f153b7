//! Configuration management for gleaner
//!
//! A run is described by one TOML file holding global fetch settings, the
//! output writer and the list of scrapers. A few settings, notably the writer
//! credentials, can be overridden through environment variables so they do not
//! have to live in the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::models::ScraperSpec;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Fetch settings shared by all scrapers
    #[serde(default)]
    pub global: GlobalConfig,

    /// Where items go
    #[serde(default)]
    pub writer: WriterConfig,

    #[serde(default)]
    pub scrapers: Vec<ScraperSpec>,
}

/// Fetch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// User agent string
    pub user_agent: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Retry attempts for transient fetch failures
    pub max_retries: u32,

    /// Rate limit per fetcher (requests per second)
    pub requests_per_second: u32,

    /// Base URL of the rendering service used for `render_js` scrapers
    pub render_endpoint: String,

    /// Capacity of the channel between scrapers and the writer
    pub channel_capacity: usize,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("gleaner/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 30,
            max_retries: 3,
            requests_per_second: 5,
            render_endpoint: String::from("http://localhost:3000"),
            channel_capacity: 100,
        }
    }
}

impl GlobalConfig {
    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Output writer kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriterKind {
    #[default]
    Stdout,
    Api,
}

impl std::str::FromStr for WriterKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(Self::Stdout),
            "api" => Ok(Self::Api),
            other => anyhow::bail!("unknown writer type '{other}', expected 'stdout' or 'api'"),
        }
    }
}

/// Output writer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    #[serde(rename = "type")]
    pub kind: WriterKind,

    /// API endpoint
    pub uri: String,

    pub user: String,

    pub password: String,
}

impl Config {
    /// Load a configuration file, apply environment overrides and validate
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override settings from `GLEANER_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(user_agent) = env_var("GLEANER_USER_AGENT") {
            self.global.user_agent = user_agent;
        }
        if let Some(endpoint) = env_var("GLEANER_RENDER_ENDPOINT") {
            self.global.render_endpoint = endpoint;
        }
        if let Some(kind) = env_var("GLEANER_WRITER_TYPE") {
            self.writer.kind = kind.parse().context("Invalid GLEANER_WRITER_TYPE")?;
        }
        if let Some(uri) = env_var("GLEANER_WRITER_URI") {
            self.writer.uri = uri;
        }
        if let Some(user) = env_var("GLEANER_WRITER_USER") {
            self.writer.user = user;
        }
        if let Some(password) = env_var("GLEANER_WRITER_PASSWORD") {
            self.writer.password = password;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.scrapers.is_empty() {
            anyhow::bail!("no scrapers configured");
        }

        let mut names = HashSet::new();
        for (index, scraper) in self.scrapers.iter().enumerate() {
            if scraper.name.trim().is_empty() {
                anyhow::bail!("scraper #{index} has no name");
            }
            if !names.insert(scraper.name.as_str()) {
                anyhow::bail!("scraper name '{}' is used more than once", scraper.name);
            }
            if scraper.url.trim().is_empty() {
                anyhow::bail!("scraper '{}' has no url", scraper.name);
            }
            if scraper.item.trim().is_empty() {
                anyhow::bail!("scraper '{}' has no item selector", scraper.name);
            }
        }

        if self.writer.kind == WriterKind::Api && self.writer.uri.trim().is_empty() {
            anyhow::bail!("the api writer needs a uri");
        }

        if self.global.requests_per_second == 0 {
            anyhow::bail!("requests_per_second must be greater than 0");
        }

        if self.global.channel_capacity == 0 {
            anyhow::bail!("channel_capacity must be greater than 0");
        }

        Ok(())
    }

    /// Scraper with the given name
    pub fn scraper(&self, name: &str) -> Option<&ScraperSpec> {
        self.scrapers.iter().find(|s| s.name == name)
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [[scrapers]]
        name = "kaserne"
        url = "https://kaserne.test/programm"
        item = "div.event"
    "#;

    #[test]
    fn test_minimal_config_is_valid() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.writer.kind, WriterKind::Stdout);
        assert_eq!(config.global.channel_capacity, 100);
        assert!(config.global.user_agent.starts_with("gleaner/"));
    }

    #[test]
    fn test_default_config_has_no_scrapers() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("no scrapers"));
    }

    #[test]
    fn test_duplicate_scraper_names() {
        let mut config = Config::from_toml(MINIMAL).unwrap();
        config.scrapers.push(config.scrapers[0].clone());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_writer_needs_uri() {
        let mut config = Config::from_toml(MINIMAL).unwrap();
        config.writer.kind = WriterKind::Api;
        assert!(config.validate().is_err());

        config.writer.uri = "https://api.test/events".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_rate_and_capacity_rejected() {
        let mut config = Config::from_toml(MINIMAL).unwrap();
        config.global.requests_per_second = 0;
        assert!(config.validate().is_err());

        let mut config = Config::from_toml(MINIMAL).unwrap();
        config.global.channel_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_writer_kind_from_str() {
        assert_eq!("API".parse::<WriterKind>().unwrap(), WriterKind::Api);
        assert!("file".parse::<WriterKind>().is_err());
    }

    #[test]
    fn test_request_timeout_conversion() {
        let config = GlobalConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }
}
