//! Materializing a deployment plan: on disk, as a bundle, or as a profile.
//!
//! [`apply`] renders every planned file and writes it below the `.cursor`
//! directory through [`ManagedFile`], so each file is replaced atomically and
//! unchanged files are never touched. [`bundle`] produces the same content
//! without writing, for external profile systems. [`inventory`] reads back
//! what a previous run left behind.
pub mod bundle;
pub mod inventory;

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::OrchestratorError;
use crate::logging::{FileEntry, FileStatus, Log};
use crate::plan::{DeploymentPlan, LOCAL_ONLY_PATTERNS};
use crate::resources::{
    Applicable as _, ManagedFile, Resource as _, ResourceChange, ResourceState,
};
use crate::templates::Renderer;
use crate::workflow::{DeployRun, DeployState};

pub use bundle::{ExportBundle, ExportFormat, ExportMetadata, ExportedFile, export, snapshot};
pub use inventory::{Inventory, McpConfig};

/// Name of the generated ignore file inside the `.cursor` directory.
pub const IGNORE_FILE: &str = ".gitignore";

/// Ignore patterns that re-include the shared, versioned configuration.
const KEEP_PATTERNS: &[&str] = &["!rules/", "!prompts/", "!mcp.json"];

/// The on-disk result of applying a plan.
#[derive(Debug, Clone, Serialize)]
pub struct DeployedConfig {
    /// The `.cursor` directory written to.
    pub cursor_dir: PathBuf,
    /// Outcome per file, in application order; the ignore file comes last.
    pub files: Vec<FileEntry>,
    /// Entries written to the ignore file.
    pub ignore_entries: Vec<String>,
    /// Whether nothing was written.
    pub dry_run: bool,
}

impl DeployedConfig {
    /// Number of files with `status`.
    #[must_use]
    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }

    /// Targets with `status`.
    pub fn targets_with(&self, status: FileStatus) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .filter(move |f| f.status == status)
            .map(|f| f.target.as_str())
    }
}

/// Apply `plan` below `cursor_dir`, advancing `run` through the rendering
/// and writing states for every file.
///
/// A dry run renders everything, so template failures still surface, but
/// writes nothing and records [`FileStatus::Planned`] for files that would
/// change. An opted-out plan writes nothing, not even the ignore file.
///
/// Files written before a failure stay on disk.
///
/// # Errors
///
/// Returns the first rendering or write failure. The failing file is
/// recorded as [`FileStatus::Failed`] and `run` is left in
/// [`DeployState::Failed`].
pub fn apply(
    plan: &DeploymentPlan,
    renderer: &Renderer,
    cursor_dir: &Path,
    log: &dyn Log,
    run: &mut DeployRun,
) -> Result<DeployedConfig, OrchestratorError> {
    let dry_run = plan.options.dry_run;
    let mut deployed = DeployedConfig {
        cursor_dir: cursor_dir.to_path_buf(),
        files: Vec::with_capacity(plan.files.len() + 1),
        ignore_entries: plan.ignore_entries.clone(),
        dry_run,
    };
    if plan.opted_out {
        return Ok(deployed);
    }

    for file in &plan.files {
        let target = file.descriptor.target_display();
        run.transition_to(DeployState::Rendering, log);
        log.debug(&format!("rendering {} -> {target}", file.descriptor.id));
        let content = match renderer.render(&file.descriptor, &file.variables) {
            Ok(content) => content,
            Err(e) => {
                let message = Some(e.to_string());
                record(log, &mut deployed, &target, FileStatus::Failed, message);
                run.transition_to(DeployState::Failed, log);
                return Err(e.into());
            }
        };

        run.transition_to(DeployState::Writing, log);
        let managed = ManagedFile::new(
            cursor_dir.join(&file.descriptor.target),
            content,
            plan.options.force,
        );
        if let Err(e) = write_one(&managed, &target, dry_run, log, &mut deployed) {
            let message = Some(e.to_string());
            record(log, &mut deployed, &target, FileStatus::Failed, message);
            run.transition_to(DeployState::Failed, log);
            return Err(e);
        }
    }

    if !plan.ignore_entries.is_empty() {
        let ignore = ManagedFile::new(
            cursor_dir.join(IGNORE_FILE),
            render_ignore_file(&plan.ignore_entries),
            true,
        );
        if let Err(e) = write_one(&ignore, IGNORE_FILE, dry_run, log, &mut deployed) {
            let message = Some(e.to_string());
            record(log, &mut deployed, IGNORE_FILE, FileStatus::Failed, message);
            run.transition_to(DeployState::Failed, log);
            return Err(e);
        }
    }

    Ok(deployed)
}

/// Write (or, in a dry run, evaluate) one managed file and record the outcome.
fn write_one(
    file: &ManagedFile,
    target: &str,
    dry_run: bool,
    log: &dyn Log,
    deployed: &mut DeployedConfig,
) -> Result<(), OrchestratorError> {
    if dry_run {
        let (status, message) = match file.current_state()? {
            ResourceState::Correct => (FileStatus::Unchanged, None),
            ResourceState::Invalid { reason } => (FileStatus::Skipped, Some(reason)),
            ResourceState::Incorrect { .. } if !file.force => (
                FileStatus::Skipped,
                Some("existing file differs (use --force to overwrite)".to_string()),
            ),
            ResourceState::Missing => (FileStatus::Planned, Some("would create".to_string())),
            ResourceState::Incorrect { current } => {
                (FileStatus::Planned, Some(format!("would replace {current}")))
            }
        };
        if status == FileStatus::Planned {
            let detail = message.as_deref().unwrap_or_default();
            log.dry_run(&format!("{target} ({detail})"));
        }
        record(log, deployed, target, status, message);
        return Ok(());
    }

    match file.apply()? {
        ResourceChange::Applied => {
            log.info(&format!("wrote {target}"));
            record(log, deployed, target, FileStatus::Written, None);
        }
        ResourceChange::AlreadyCorrect => {
            log.debug(&format!("{target} is up to date"));
            record(log, deployed, target, FileStatus::Unchanged, None);
        }
        ResourceChange::Skipped { reason } => {
            log.warn(&format!("skipped {target}: {reason}"));
            record(log, deployed, target, FileStatus::Skipped, Some(reason));
        }
    }
    Ok(())
}

fn record(
    log: &dyn Log,
    deployed: &mut DeployedConfig,
    target: &str,
    status: FileStatus,
    message: Option<String>,
) {
    log.record_file(target, status, message.as_deref());
    deployed.files.push(FileEntry {
        target: target.to_string(),
        status,
        message,
    });
}

/// Content of the generated `.cursor/.gitignore`.
///
/// Local-only patterns come first, then the re-includes for the shared
/// configuration, then user rule files, which must stay last to win.
#[must_use]
pub fn render_ignore_file(entries: &[String]) -> String {
    let (local, user): (Vec<&String>, Vec<&String>) = entries
        .iter()
        .partition(|e| LOCAL_ONLY_PATTERNS.contains(&e.as_str()));

    let mut out =
        String::from("# Cursor IDE local customizations (generated by mcp-orchestrator)\n");
    for entry in local {
        out.push_str(entry);
        out.push('\n');
    }
    out.push_str("\n# Keep rule templates and prompts in VCS\n");
    for entry in KEEP_PATTERNS {
        out.push_str(entry);
        out.push('\n');
    }
    if !user.is_empty() {
        out.push_str("\n# Developer-specific rules\n");
        for entry in user {
            out.push_str(entry);
            out.push('\n');
        }
    }
    out
}
