//! A file whose content is owned by the orchestrator.
use std::path::{Path, PathBuf};

use super::helpers::fs::{atomic_write, sha256_hex};
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::error::DeployError;

/// A file that should hold exactly `content`.
///
/// An existing file with different content is only replaced when `force`
/// is set.
#[derive(Debug, Clone)]
pub struct ManagedFile {
    /// Destination path.
    pub path: PathBuf,
    /// Desired content.
    pub content: String,
    /// Replace differing files.
    pub force: bool,
}

impl ManagedFile {
    /// Create a managed file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>, force: bool) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            force,
        }
    }

    /// SHA-256 of the desired content.
    #[must_use]
    pub fn digest(&self) -> String {
        sha256_hex(self.content.as_bytes())
    }
}

impl Applicable for ManagedFile {
    fn apply(&self) -> Result<ResourceChange, DeployError> {
        match self.current_state()? {
            ResourceState::Correct => Ok(ResourceChange::AlreadyCorrect),
            ResourceState::Invalid { reason } => Ok(ResourceChange::Skipped { reason }),
            ResourceState::Incorrect { .. } if !self.force => Ok(ResourceChange::Skipped {
                reason: "existing file differs (use --force to overwrite)".to_string(),
            }),
            ResourceState::Missing | ResourceState::Incorrect { .. } => {
                atomic_write(&self.path, self.content.as_bytes())?;
                Ok(ResourceChange::Applied)
            }
        }
    }
}

impl Resource for ManagedFile {
    fn current_state(&self) -> Result<ResourceState, DeployError> {
        let path: &Path = &self.path;
        if path.is_dir() {
            return Ok(ResourceState::Invalid {
                reason: "target is a directory".to_string(),
            });
        }
        if !path.exists() {
            return Ok(ResourceState::Missing);
        }
        let current = std::fs::read(path).map_err(|source| DeployError::WriteFailure {
            path: path.to_path_buf(),
            source,
        })?;
        let current = sha256_hex(&current);
        if current == self.digest() {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: format!("sha256:{}", current.get(..12).unwrap_or(&current)),
            })
        }
    }
}
