//! Command: check project environment variables.
use anyhow::{Result, bail};

use crate::cli::GlobalOpts;
use crate::config::project_types::{self, EnvReport};
use crate::logging::{Log, Logger};

use super::CommandSetup;

/// Run the check-env command.
///
/// # Errors
///
/// Returns an error if the project type is unknown or a required variable
/// is unset.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let settings = &setup.settings;
    let project = project_types::lookup(&settings.project_type)?;

    log.stage(&format!("Environment for '{}'", project.name));
    let report = project.check_env(&settings.env);
    print_report(project, &report, &settings.env, log);

    if !report.is_complete() {
        bail!(
            "missing required environment variable(s): {}",
            report.missing_required.join(", ")
        );
    }
    Ok(())
}

fn print_report(
    project: &project_types::ProjectType,
    report: &EnvReport,
    env: &crate::config::EnvSnapshot,
    log: &dyn Log,
) {
    for var in project.required_env {
        if report.missing_required.contains(var) {
            log.error(&format!("{var}: not set (required)"));
        } else {
            log.info(&format!("{var}: {}", env.get(var).unwrap_or_default()));
        }
    }
    for var in project.optional_env {
        if report.missing_optional.contains(var) {
            log.warn(&format!("{var}: not set (optional)"));
        } else {
            log.info(&format!("{var}: set"));
        }
    }
    if project.required_env.is_empty() && project.optional_env.is_empty() {
        log.info("no environment variables used");
    }
}
