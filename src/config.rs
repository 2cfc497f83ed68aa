use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{BoardError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base path of the board API; `/applications` is appended.
    pub base_url: String,
    pub page_size: u32,
    /// Restore the pre-drag snapshot when a status patch fails.
    pub rollback_on_failure: bool,
    pub activation_distance: f64,
    pub timeout_secs: u64,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/board".to_string(),
            page_size: 100,
            rollback_on_failure: true,
            activation_distance: 8.0,
            timeout_secs: 10,
            log_json: false,
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "jobboard")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| BoardError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BoardError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Load `path` if given, else the default location if it exists, else defaults.
    /// Environment overrides are applied on top.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::load(&p)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("JOBBOARD_BASE_URL") {
            self.base_url = url;
        }
        if let Some(size) = lookup("JOBBOARD_PAGE_SIZE") {
            self.page_size = size
                .parse()
                .map_err(|_| BoardError::Config(format!("JOBBOARD_PAGE_SIZE '{}' is not a number", size)))?;
        }
        if let Some(flag) = lookup("JOBBOARD_LOG_JSON") {
            self.log_json = matches!(flag.as_str(), "1" | "true" | "yes");
        }
        if let Some(flag) = lookup("JOBBOARD_ROLLBACK") {
            self.rollback_on_failure = !matches!(flag.as_str(), "0" | "false" | "no");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| BoardError::Config(format!("base_url '{}': {}", self.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BoardError::Config(format!(
                "base_url must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.page_size == 0 {
            return Err(BoardError::Config("page_size must be at least 1".to_string()));
        }
        if !self.activation_distance.is_finite() || self.activation_distance < 0.0 {
            return Err(BoardError::Config(
                "activation_distance must be a finite, non-negative number".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| BoardError::Config(e.to_string()))
    }
}
