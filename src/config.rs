use crate::style::{StyleConfig, StyleError};
use crate::timeline::TimeConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming a config file to load at start-up.
pub const CONFIG_ENV: &str = "DATATRACE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid style: {0}")]
    Style(#[from] StyleError),
}

/// Time axis, question list and style. Scores are never part of it.
///
/// Every field is optional in the JSON document:
///
/// ```json
/// {
///   "time": { "start_date": "2024-01-01", "end_date": "2024-12-31", "granularity": "month" },
///   "items": ["How healthy am I?"],
///   "style": { "color_palette": "custom", "custom_colors": ["#66BB6A"] }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub time: TimeConfig,
    pub items: Vec<String>,
    pub style: StyleConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            time: TimeConfig::default(),
            items: crate::session::DEFAULT_QUESTIONS
                .iter()
                .map(|q| q.to_string())
                .collect(),
            style: StyleConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.style.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SessionConfig, ConfigError> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = SessionConfig::from_json_str(&json)?;
    tracing::info!(path = %path.display(), items = config.items.len(), "loaded config");
    Ok(config)
}
