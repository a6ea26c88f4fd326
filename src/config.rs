//! Configuration: defaults, optional JSON file, environment overrides

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
    /// Also write daily-rolling log files here
    pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            directory: None,
        }
    }
}

/// Catalog data layer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub api_base_url: String,
    /// Snapshot time-to-live
    pub ttl_secs: u64,
    /// Upper bound on a single remote request
    pub request_timeout_ms: u64,
    /// Where to keep the convenience snapshot, if anywhere
    pub snapshot_path: Option<PathBuf>,
    pub log: LogConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            ttl_secs: 300,
            request_timeout_ms: 10_000,
            snapshot_path: None,
            log: LogConfig::default(),
        }
    }
}

impl CatalogConfig {
    /// Defaults, then the file at `path` (if given), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::Configuration(format!("invalid {}: {}", path.display(), e)))
    }

    /// Apply `CATALOG_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CATALOG_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Some(ttl) = lookup("CATALOG_TTL_SECS") {
            self.ttl_secs = parse_number("CATALOG_TTL_SECS", &ttl)?;
        }
        if let Some(timeout) = lookup("CATALOG_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = parse_number("CATALOG_REQUEST_TIMEOUT_MS", &timeout)?;
        }
        if let Some(path) = lookup("CATALOG_SNAPSHOT_PATH") {
            self.snapshot_path = Some(PathBuf::from(path));
        }
        if let Some(level) = lookup("CATALOG_LOG_LEVEL") {
            self.log.level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(Error::Configuration("api_base_url is empty".to_string()));
        }
        if self.ttl_secs == 0 {
            return Err(Error::Configuration("ttl_secs must be positive".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::Configuration(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Configuration(format!("{} is not a number: {:?}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = CatalogConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_file_then_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"api_base_url": "http://api.test", "ttl_secs": 60}}"#).unwrap();

        let mut config = CatalogConfig::from_file(file.path()).unwrap();
        assert_eq!(config.api_base_url, "http://api.test");
        assert_eq!(config.ttl_secs, 60);
        assert_eq!(config.request_timeout_ms, 10_000);

        let env: HashMap<&str, &str> =
            [("CATALOG_TTL_SECS", "120"), ("CATALOG_SNAPSHOT_PATH", "/tmp/c.json")]
                .into_iter()
                .collect();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.ttl_secs, 120);
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/tmp/c.json")));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = CatalogConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "CATALOG_TTL_SECS").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(Error::Configuration(_))));

        config.ttl_secs = 0;
        assert!(config.validate().is_err());
    }
}
