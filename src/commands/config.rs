use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Default exclusive bound on operator name length in bytes (`NAMEDATALEN`).
pub const DEFAULT_MAX_NAME_LEN: usize = 64;

/// Tunables for the operator commands.
///
/// Read from the `[operators]` table of a TOML file; missing keys keep their
/// defaults.
///
/// ```toml
/// [operators]
/// allow_legacy_join_signature = false
/// max_name_len = 32
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorCommandOptions {
    /// Accept join estimators with the four-argument signature.
    pub allow_legacy_join_signature: bool,
    /// Operator names must be strictly shorter than this.
    pub max_name_len: usize,
}

impl Default for OperatorCommandOptions {
    fn default() -> Self {
        Self {
            allow_legacy_join_signature: true,
            max_name_len: DEFAULT_MAX_NAME_LEN,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    operators: OperatorCommandOptions,
}

impl OperatorCommandOptions {
    /// Parses options from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(contents).map_err(|source| ConfigError::Parse { path: None, source })?;
        Ok(raw.operators)
    }

    /// Loads options from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })?;
        debug!(path = %path.display(), options = ?raw.operators, "operator.config.loaded");
        Ok(raw.operators)
    }
}

/// Failure loading [`OperatorCommandOptions`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read operator config {}: {source}", .path.display())]
    Read {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The contents are not valid TOML for these options.
    #[error("failed to parse operator config{}: {source}", origin(.path))]
    Parse {
        /// File the text came from, if any.
        path: Option<PathBuf>,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}

fn origin(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" {}", path.display()),
        None => String::new(),
    }
}
