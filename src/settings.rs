use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

const ENV_API_URL: &str = "MANGA_READER_API_URL";
const ENV_DEBUG: &str = "MANGA_READER_DEBUG";
const ENV_HEARTBEAT_SECS: &str = "MANGA_READER_HEARTBEAT_SECS";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub heartbeat_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub catalog_ttl_secs: u64,
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            heartbeat_interval_secs: DEFAULT_HEARTBEAT_INTERVAL_SECS,
            request_timeout_secs: 10,
            catalog_ttl_secs: 300,
            debug: false,
        }
    }
}

impl AppConfig {
    /// Reads the settings file (if any) and applies environment overrides.
    /// A malformed file falls back to defaults rather than failing startup.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read settings from {}", path.display()))?;
                serde_json::from_str(&contents).unwrap_or_default()
            }
            _ => AppConfig::default(),
        };

        config.apply_overrides(lookup);
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|value| !value.trim().is_empty()) {
            self.api_base_url = url;
        }

        if let Some(value) = lookup(ENV_DEBUG) {
            self.debug = value == "1" || value.eq_ignore_ascii_case("true");
        }

        if let Some(secs) = lookup(ENV_HEARTBEAT_SECS).and_then(|value| value.parse::<u64>().ok()) {
            if secs > 0 {
                self.heartbeat_interval_secs = secs;
            }
        }
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_ttl_secs)
    }

    /// Base URL without a trailing slash, ready for `format!("{base}/api/...")`.
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }
}
