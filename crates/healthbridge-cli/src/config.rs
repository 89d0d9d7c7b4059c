//! `healthbridge.toml` loading and environment overlay.
//!
//! Precedence, lowest first: built-in defaults, the config file, the
//! `HEALTHBRIDGE_*` environment, then command-line flags (applied by the
//! caller).

use std::path::{Path, PathBuf};

use healthbridge_core::DEFAULT_DECODER_TYPE;
use serde::Deserialize;
use thiserror::Error;

/// File picked up from the working directory when `--config` is absent.
pub const LOCAL_CONFIG_FILE: &str = "healthbridge.toml";
pub const ENV_DEFAULT_TYPE: &str = "HEALTHBRIDGE_DEFAULT_TYPE";
pub const ENV_LOG: &str = "HEALTHBRIDGE_LOG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid value '{value}' for {name}: expected an integer")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Mode for decoders created without an explicit type.
    pub default_type: i32,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            default_type: DEFAULT_DECODER_TYPE,
            log_level: "info".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Load from `path`, or from `./healthbridge.toml` when it exists, then
    /// apply the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let local = Path::new(LOCAL_CONFIG_FILE);
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if local.is_file() => Self::from_file(local)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Overlay `HEALTHBRIDGE_*` values read through `lookup`. Returns the
    /// names of the variables that took effect.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Vec<&'static str>, ConfigError> {
        let mut applied = Vec::new();
        if let Some(value) = lookup(ENV_DEFAULT_TYPE).filter(|v| !v.trim().is_empty()) {
            self.default_type = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_DEFAULT_TYPE,
                value: value.clone(),
            })?;
            applied.push(ENV_DEFAULT_TYPE);
        }
        if let Some(value) = lookup(ENV_LOG).filter(|v| !v.trim().is_empty()) {
            self.log_level = value;
            applied.push(ENV_LOG);
        }
        Ok(applied)
    }
}
