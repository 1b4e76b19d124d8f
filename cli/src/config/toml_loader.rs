//! `orchestrator.toml` parsing.
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// File name looked up in the target root when no explicit path is given.
pub const FILE_NAME: &str = "orchestrator.toml";

/// Contents of `orchestrator.toml`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Default project type.
    pub project_type: Option<String>,
    /// Template directory, relative to the config file.
    pub templates: Option<PathBuf>,
    /// Which layer wins when CI and platform templates share a target.
    pub ci_precedence: Option<String>,
    /// Custom rule files, relative to the config file.
    pub custom_rules: Vec<PathBuf>,
    /// Extra template variables.
    pub variables: BTreeMap<String, String>,
}

impl FileConfig {
    /// Rebase relative paths onto `base` (the directory holding the file).
    #[must_use]
    pub fn rebased(mut self, base: &Path) -> Self {
        self.templates = self.templates.map(|p| base.join(p));
        self.custom_rules = self.custom_rules.iter().map(|p| base.join(p)).collect();
        self
    }
}

/// Deserialize a TOML file, returning the empty configuration when the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file exists but cannot be read, or
/// [`ConfigError::Parse`] if it is not valid for `T`.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = if path.exists() {
        std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        String::new()
    };

    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })
}
