use std::path::Path;
use std::time::Duration;
use serde::Deserialize;
use anyhow::{Context, Result};
use crate::mdns::Filters;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Name shown in the server's approval prompt
    #[serde(default = "default_client_name")]
    pub name: String,
    /// Per-frame-part deadline when reading from the server
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// How long an unfiltered scan listens for announcements
    #[serde(default = "default_scan_delay")]
    pub scan_delay_secs: u64,
    /// Upper bound for a filtered scan
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,
    /// Only accept hosts whose attributes equal these values
    #[serde(default)]
    pub filters: Filters,
}

fn default_client_name() -> String {
    "BoomRustClient".to_string()
}

fn default_read_timeout() -> u64 {
    10
}

fn default_scan_delay() -> u64 {
    3
}

fn default_max_wait() -> u64 {
    10
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: default_client_name(),
            read_timeout_secs: default_read_timeout(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            scan_delay_secs: default_scan_delay(),
            max_wait_secs: default_max_wait(),
            filters: Filters::new(),
        }
    }
}

impl ClientConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl DiscoveryConfig {
    pub fn scan_delay(&self) -> Duration {
        Duration::from_secs(self.scan_delay_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.client.name, "BoomRustClient");
        assert_eq!(config.client.read_timeout(), Duration::from_secs(10));
        assert_eq!(config.discovery.scan_delay(), Duration::from_secs(3));
        assert_eq!(config.discovery.max_wait(), Duration::from_secs(10));
        assert!(config.discovery.filters.is_empty());
    }

    #[test]
    fn test_filters_keep_their_types() {
        let config = Config::parse(
            r#"
            [client]
            name = "Living Room Pi"

            [discovery]
            max_wait_secs = 5

            [discovery.filters]
            port = 8080
            server = "studio.local."
            "#,
        )
        .unwrap();

        assert_eq!(config.client.name, "Living Room Pi");
        assert_eq!(config.discovery.max_wait_secs, 5);
        assert_eq!(config.discovery.scan_delay_secs, 3);
        assert_eq!(config.discovery.filters["port"], json!(8080));
        assert_eq!(config.discovery.filters["server"], json!("studio.local."));
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = Config::load("/nonexistent/boomctl.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/boomctl.toml"));
    }
}
