//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::LimeLoadConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable that overrides `listener.port`.
pub const PORT_ENV: &str = "PORT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {0} is empty")]
    Empty(String),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid PORT value '{0}'")]
    BadPort(String),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<LimeLoadConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    if content.trim().is_empty() {
        return Err(ConfigError::Empty(path.display().to_string()));
    }

    parse_config(&content, std::env::var(PORT_ENV).ok().as_deref())
}

/// Parse, apply the port override, and validate.
pub fn parse_config(content: &str, port_override: Option<&str>) -> Result<LimeLoadConfig, ConfigError> {
    let mut config: LimeLoadConfig = toml::from_str(content)?;

    if let Some(raw) = port_override {
        config.listener.port = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::BadPort(raw.to_string()))?;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
