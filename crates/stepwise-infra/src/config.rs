//! Configuration loader for Stepwise.
//!
//! Reads `config.toml` and deserializes it into [`StepwiseConfig`]. The
//! implicit location is `{config_dir}/stepwise/config.toml`; a file there
//! that is missing or malformed falls back to defaults. A path the user
//! names explicitly must exist and parse.

use std::path::{Path, PathBuf};

use stepwise_types::config::StepwiseConfig;
use thiserror::Error;

/// Errors from reading an explicitly requested config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// `{config_dir}/stepwise/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("stepwise").join("config.toml"))
}

/// Read and parse `path`, failing on any I/O or parse error.
pub async fn read_config(path: &Path) -> Result<StepwiseConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load configuration from `explicit`, or from the default location.
///
/// - `explicit` given: any read or parse failure is returned.
/// - Default location missing: returns [`StepwiseConfig::default()`].
/// - Default location unreadable or malformed: logs a warning and returns
///   the default.
pub async fn load_config(explicit: Option<&Path>) -> Result<StepwiseConfig, ConfigError> {
    if let Some(path) = explicit {
        return read_config(path).await;
    }

    let Some(config_path) = default_config_path() else {
        tracing::debug!("No config directory on this platform, using defaults");
        return Ok(StepwiseConfig::default());
    };
    Ok(load_or_default(&config_path).await)
}

async fn load_or_default(config_path: &Path) -> StepwiseConfig {
    match read_config(config_path).await {
        Ok(config) => config,
        Err(ConfigError::Read { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            StepwiseConfig::default()
        }
        Err(err) => {
            tracing::warn!("{err}, using defaults");
            StepwiseConfig::default()
        }
    }
}
