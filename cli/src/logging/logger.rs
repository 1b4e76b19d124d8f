//! Structured logger with dry-run awareness and summary collection.
use std::path::PathBuf;
use std::sync::Mutex;

use super::types::{FileEntry, FileStatus, Log};
use super::utils::log_file_path;
use super::{DRY_RUN_TARGET, STAGE_TARGET};

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger with dry-run awareness and a per-file summary.
///
/// Messages are emitted as [`tracing`] events; when the subscriber from
/// [`init_subscriber`](super::init_subscriber) is installed they also land in
/// `$XDG_CACHE_HOME/mcp-orchestrator/<command>.log` with ANSI codes stripped.
#[derive(Debug)]
pub struct Logger {
    files: Mutex<Vec<FileEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger for `command`.
    ///
    /// Only remembers the log file path for the summary; the file itself is
    /// created by the subscriber's file layer.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            files: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Return the log file path, if available.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Return a copy of every recorded file outcome.
    #[must_use]
    pub fn file_entries(&self) -> Vec<FileEntry> {
        self.files.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (console only with `-v`; always in the log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Record a file outcome for the summary.
    pub fn record_file(&self, target: &str, status: FileStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.files.lock() {
            guard.push(FileEntry {
                target: target.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Count the files that failed.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.files.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|f| f.status == FileStatus::Failed)
                .count()
        })
    }

    /// Print the summary of all recorded files.
    pub fn print_summary(&self) {
        let files = self.file_entries();
        if files.is_empty() {
            return;
        }

        self.stage("Summary");

        let mut written = 0u32;
        let mut unchanged = 0u32;
        let mut skipped = 0u32;
        let mut planned = 0u32;
        let mut failed = 0u32;

        for file in &files {
            let (icon, color) = match file.status {
                FileStatus::Written => {
                    written += 1;
                    ("✓", "\x1b[32m")
                }
                FileStatus::Unchanged => {
                    unchanged += 1;
                    ("·", "\x1b[2m")
                }
                FileStatus::Skipped => {
                    skipped += 1;
                    ("○", "\x1b[33m")
                }
                FileStatus::Planned => {
                    planned += 1;
                    ("~", "\x1b[37m")
                }
                FileStatus::Failed => {
                    failed += 1;
                    ("✗", "\x1b[31m")
                }
            };

            let suffix = file
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));

            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", file.target));
        }

        let total = written + unchanged + skipped + planned + failed;
        self.info(&format!(
            "{total} files: \x1b[32m{written} written\x1b[0m, \x1b[2m{unchanged} unchanged\x1b[0m, \x1b[33m{skipped} skipped\x1b[0m, \x1b[37m{planned} planned\x1b[0m, \x1b[31m{failed} failed\x1b[0m"
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);

    fn record_file(&self, target: &str, status: FileStatus, message: Option<&str>) {
        self.record_file(target, status, message);
    }
}
