use crate::error::ConfigError;
use crate::search::{ScoreOrder, SearchQuery};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const ENV_API_URL: &str = "FLOWSTUDIO_API_URL";
pub const ENV_LOG: &str = "FLOWSTUDIO_LOG";

/// Settings for talking to the workflow backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Root the resource paths (`/agents`, `/ai-resources`, ...) are appended to.
    pub base_url: String,
    /// No timeout is applied unless set; the backend bounds request duration.
    pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub top_k: usize,
    pub score_order: ScoreOrder,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: SearchQuery::DEFAULT_TOP_K,
            score_order: ScoreOrder::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// An `EnvFilter` directive, e.g. `info` or `flowstudio=debug`.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Top-level configuration, usually read from a TOML file.
///
/// ```toml
/// [api]
/// base_url = "https://studio.example.com/api"
///
/// [search]
/// top_k = 5
/// score_order = "lower_is_better"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub api: ApiConfig,
    pub search: SearchConfig,
    pub log: LogConfig,
}

impl StudioConfig {
    /// Loads the file at `path` if given (it must exist), else the defaults,
    /// then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Applies overrides from a variable lookup; empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            self.api.base_url = url;
        }
        if let Some(filter) = lookup(ENV_LOG).filter(|v| !v.is_empty()) {
            self.log.filter = filter;
        }
    }
}
