//! Configuration management.

use anyhow::{bail, Context as _, Result};
use directories::ProjectDirs;
use linkguard::{ApiSourceConfig, EngineConfig, SourcesConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

/// Environment variable holding the VirusTotal API key
pub const VT_API_KEY_ENV: &str = "VT_API_KEY";
/// Environment variable holding the Google Safe Browsing API key
pub const SAFE_BROWSING_API_KEY_ENV: &str = "GOOGLE_SAFE_BROWSING_API_KEY";
/// Environment variable holding the urlscan.io API key
pub const URLSCAN_API_KEY_ENV: &str = "URLSCAN_API_KEY";

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Default output format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<OutputFormat>,

    /// Where feed snapshots are kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Engine timeouts and cache sizing.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Feeds and API sources.
    #[serde(default)]
    pub sources: SourcesConfig,
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "linkguard", "linkguard")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

impl Config {
    /// Default config file path.
    pub fn default_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Default feed snapshot directory.
    pub fn default_data_dir() -> Result<PathBuf> {
        Ok(project_dirs()?.data_dir().join("feeds"))
    }

    /// Load configuration from `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Override API keys from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Override API keys from `lookup`; blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let sections = [
            (VT_API_KEY_ENV, &mut self.sources.virustotal),
            (SAFE_BROWSING_API_KEY_ENV, &mut self.sources.safe_browsing),
            (URLSCAN_API_KEY_ENV, &mut self.sources.urlscan),
        ];
        for (var, section) in sections {
            if let Some(key) = lookup(var).filter(|k| !k.trim().is_empty()) {
                section.api_key = Some(key);
            }
        }
    }

    /// Feed snapshot directory: configured or platform default.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::default_data_dir(),
        }
    }

    /// Set one dotted key from a string value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "output_format" | "output" => self.output_format = Some(value.parse()?),
            "data_dir" => self.data_dir = Some(PathBuf::from(value)),
            "heuristics" => self.sources.heuristics = value.parse()?,
            "virustotal.api_key" => self.sources.virustotal.api_key = Some(value.to_string()),
            "virustotal.enabled" => self.sources.virustotal.enabled = value.parse()?,
            "safe_browsing.api_key" => {
                self.sources.safe_browsing.api_key = Some(value.to_string());
            }
            "safe_browsing.enabled" => self.sources.safe_browsing.enabled = value.parse()?,
            "urlscan.api_key" => self.sources.urlscan.api_key = Some(value.to_string()),
            "urlscan.enabled" => self.sources.urlscan.enabled = value.parse()?,
            "engine.adapter_timeout_secs" => self.engine.adapter_timeout_secs = value.parse()?,
            "engine.deep_timeout_secs" => self.engine.deep_timeout_secs = value.parse()?,
            "engine.cache_ttl_secs" => self.engine.cache_ttl_secs = value.parse()?,
            _ => bail!(
                "Unknown config key: {key}\n\n\
                 Available keys:\n  \
                 output_format              - Default output format (pretty/json/csv/yaml)\n  \
                 data_dir                   - Feed snapshot directory\n  \
                 heuristics                 - Run URL heuristics (true/false)\n  \
                 virustotal.api_key         - VirusTotal API key\n  \
                 safe_browsing.api_key      - Google Safe Browsing API key\n  \
                 urlscan.api_key            - urlscan.io API key\n  \
                 <source>.enabled           - Enable or disable a source (true/false)\n  \
                 engine.adapter_timeout_secs, engine.deep_timeout_secs, engine.cache_ttl_secs"
            ),
        }
        Ok(())
    }

    /// Copy with every API key masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for section in [
            &mut copy.sources.virustotal,
            &mut copy.sources.safe_browsing,
            &mut copy.sources.urlscan,
        ] {
            mask(section);
        }
        copy
    }
}

fn mask(section: &mut ApiSourceConfig) {
    if let Some(key) = section.api_key.as_mut() {
        *key = mask_key(key);
    }
}

/// Show the first and last four characters of a long key, nothing of a
/// short one
#[must_use]
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        String::from("****")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.sources.heuristics);
        assert_eq!(config.sources.feeds.len(), 2);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[engine]\ncache_ttl_secs = 60\n\n[sources.virustotal]\napi_key = \"abc\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.engine.cache_ttl_secs, 60);
        assert_eq!(config.engine.adapter_timeout_secs, 8);
        assert_eq!(config.sources.virustotal.usable_key(), Some("abc"));
        assert!(config.sources.urlscan.usable_key().is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("urlscan.api_key", "k-123").unwrap();
        config.set("output_format", "json").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.output_format, Some(OutputFormat::Json));
    }

    #[test]
    fn environment_overrides_keys() {
        let mut config = Config::default();
        config.set("virustotal.api_key", "from-file").unwrap();
        config.apply_overrides(|name| match name {
            VT_API_KEY_ENV => Some(String::from("from-env")),
            SAFE_BROWSING_API_KEY_ENV => Some(String::from("   ")),
            _ => None,
        });

        assert_eq!(config.sources.virustotal.api_key.as_deref(), Some("from-env"));
        assert!(config.sources.safe_browsing.api_key.is_none());
    }

    #[test]
    fn unknown_keys_and_bad_values_are_rejected() {
        let mut config = Config::default();
        assert!(config.set("phishtank.api_key", "x").is_err());
        assert!(config.set("heuristics", "maybe").is_err());
        assert!(config.set("engine.cache_ttl_secs", "-1").is_err());
    }

    #[test]
    fn redaction_masks_keys() {
        let mut config = Config::default();
        config.set("virustotal.api_key", "0123456789abcdef").unwrap();
        config.set("urlscan.api_key", "short").unwrap();

        let shown = config.redacted();
        assert_eq!(shown.sources.virustotal.api_key.as_deref(), Some("0123...cdef"));
        assert_eq!(shown.sources.urlscan.api_key.as_deref(), Some("****"));
        assert!(shown.sources.safe_browsing.api_key.is_none());
    }
}
