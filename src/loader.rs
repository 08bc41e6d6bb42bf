//! Config loader.
//!
//! Builds a [`Config`] from a YAML or TOML file, or from environment
//! variables.

use crate::args::parse_bool;
use crate::schema::Config;
use std::path::Path;

/// Environment variable that turns on rewrite mode.
pub const REWRITE_ENV: &str = "DATADRIVEN_REWRITE";

/// Environment variable that turns on verbose output.
pub const VERBOSE_ENV: &str = "DATADRIVEN_VERBOSE";

/// Error type for config loading operations.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Failed to read the file.
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse YAML.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Failed to parse TOML.
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    /// Unsupported file extension.
    #[error("unsupported file format: {0} (expected .yaml, .yml, or .toml)")]
    UnsupportedFormat(String),
    /// An environment variable holds something other than a boolean.
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Load a config from a file path.
pub fn load_config(path: &Path) -> Result<Config, LoadError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let contents = std::fs::read_to_string(path)?;

    match ext {
        "yaml" | "yml" => Ok(serde_yaml::from_str(&contents)?),
        "toml" => Ok(toml::from_str(&contents)?),
        other => Err(LoadError::UnsupportedFormat(other.to_string())),
    }
}

/// Build a config from [`REWRITE_ENV`] and [`VERBOSE_ENV`].
///
/// Unset or empty variables leave the default. Values use the usual boolean
/// spellings (`1`, `t`, `true`, `0`, `f`, `false`, ...).
pub fn config_from_env() -> Result<Config, LoadError> {
    config_from_vars(|var| std::env::var(var).ok())
}

/// Like [`config_from_env`], reading variables through `lookup`.
pub fn config_from_vars<F>(lookup: F) -> Result<Config, LoadError>
where
    F: Fn(&str) -> Option<String>,
{
    let flag = |var: &'static str| -> Result<bool, LoadError> {
        match lookup(var) {
            None => Ok(false),
            Some(value) if value.is_empty() => Ok(false),
            Some(value) => parse_bool(&value).ok_or(LoadError::InvalidEnv { var, value }),
        }
    };
    Ok(Config {
        rewrite: flag(REWRITE_ENV)?,
        verbose: flag(VERBOSE_ENV)?,
    })
}
