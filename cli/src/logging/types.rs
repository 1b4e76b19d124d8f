//! Core logging types: per-file outcomes and the [`Log`] trait.

use serde::Serialize;

/// Outcome of one deployed file, recorded for the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// Target path relative to the `.cursor` directory.
    pub target: String,
    /// What happened to it.
    pub status: FileStatus,
    /// Optional detail (skip reason, error message).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// What happened to a deployed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Created or replaced.
    Written,
    /// Already identical to the rendered output.
    Unchanged,
    /// Left alone (differs without `--force`, or not a regular file).
    Skipped,
    /// Would be written (dry run).
    Planned,
    /// Rendering or writing failed.
    Failed,
}

impl FileStatus {
    /// Lowercase label used in summaries and JSON.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Written => "written",
            Self::Unchanged => "unchanged",
            Self::Skipped => "skipped",
            Self::Planned => "planned",
            Self::Failed => "failed",
        }
    }
}

/// Logging interface shared by [`Logger`](super::Logger) and test doubles.
///
/// Everything that logs takes `&dyn Log`, so a command can hand the real
/// logger in while unit tests pass a capturing one.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message.
    fn debug(&self, msg: &str);
    /// Log a warning.
    fn warn(&self, msg: &str);
    /// Log an error.
    fn error(&self, msg: &str);
    /// Log an action that a dry run skips.
    fn dry_run(&self, msg: &str);
    /// Record a file outcome for the summary.
    fn record_file(&self, target: &str, status: FileStatus, message: Option<&str>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_serde_names() {
        for status in [
            FileStatus::Written,
            FileStatus::Unchanged,
            FileStatus::Skipped,
            FileStatus::Planned,
            FileStatus::Failed,
        ] {
            let json = serde_json::to_string(&status).unwrap_or_default();
            assert_eq!(json, format!("\"{}\"", status.label()));
        }
    }
}
