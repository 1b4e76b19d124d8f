//! Command: check rule frontmatter.
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::cli::{GlobalOpts, ValidateOpts};
use crate::logging::{Log, Logger};
use crate::templates::frontmatter;

use super::CommandSetup;

/// Run the validate command.
///
/// # Errors
///
/// Returns an error if any file has frontmatter errors, or warnings with
/// `--strict`.
pub fn run(global: &GlobalOpts, opts: &ValidateOpts, log: &Logger) -> Result<()> {
    let paths = if opts.paths.is_empty() {
        let setup = CommandSetup::init(global, log)?;
        deployed_rules(&setup.settings.cursor_dir.join("rules"))
    } else {
        opts.paths.clone()
    };
    if paths.is_empty() {
        log.warn("no rule files to validate");
        return Ok(());
    }

    log.stage(&format!("Validating {} rule files", paths.len()));
    let (errors, warnings) = validate_all(&paths, log);
    log.info(&format!("{errors} error(s), {warnings} warning(s)"));

    if errors > 0 {
        bail!("{errors} frontmatter error(s)");
    }
    if opts.strict && warnings > 0 {
        bail!("{warnings} frontmatter warning(s) (--strict)");
    }
    Ok(())
}

/// Check every file, logging each problem. Returns `(errors, warnings)`.
pub fn validate_all(paths: &[PathBuf], log: &dyn Log) -> (usize, usize) {
    let mut errors = 0;
    let mut warnings = 0;
    for path in paths {
        let report = frontmatter::check_file(path);
        let name = path.display();
        for e in &report.errors {
            log.error(&format!("{name}: {e}"));
        }
        for w in &report.warnings {
            log.warn(&format!("{name}: {w}"));
        }
        if report.is_valid() && report.warnings.is_empty() {
            log.info(&format!("{name}: ok"));
        }
        errors += report.errors.len();
        warnings += report.warnings.len();
    }
    (errors, warnings)
}

/// `*.mdc` files directly inside `rules_dir`, sorted.
fn deployed_rules(rules_dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(rules_dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "mdc"))
                .collect()
        })
        .unwrap_or_default();
    paths.sort();
    paths
}
