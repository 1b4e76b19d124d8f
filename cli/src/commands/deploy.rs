//! Command: render and write the Cursor configuration.
use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::exec::{Executor, SystemExecutor};
use crate::export::Inventory;
use crate::logging::{FileStatus, Logger};
use crate::workflow;

use super::CommandSetup;

/// Run the deploy command.
///
/// # Errors
///
/// Returns an error if settings cannot be resolved, planning fails, or a
/// file cannot be rendered or written.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    run_with(global, &SystemExecutor, log)
}

/// Run the deploy command with an explicit executor.
///
/// # Errors
///
/// See [`run`].
pub fn run_with(global: &GlobalOpts, executor: &dyn Executor, log: &Logger) -> Result<()> {
    log.info(&format!("mcp-orchestrator {}", crate::version()));
    let setup = CommandSetup::init(global, log)?;
    let settings = &setup.settings;

    let result = workflow::deploy(settings, executor, log);
    log.print_summary();
    let report = result?;

    if report.plan.opted_out {
        log.info("Cursor configuration deployment skipped (opt-out)");
        log.info("set MCP_ORCHESTRATOR_OPT_OUT=false or drop --opt-out to deploy");
        return Ok(());
    }

    if report.deployed.dry_run {
        log.info(&format!(
            "dry run: {} of {} files would change",
            report.deployed.count(FileStatus::Planned),
            report.deployed.files.len()
        ));
        return Ok(());
    }

    let inventory = Inventory::scan(&settings.cursor_dir);
    log.info(&format!(
        "Cursor configuration deployed to {}",
        settings.cursor_dir.display()
    ));
    log.info(&format!("rules: {} files", inventory.rules.len()));
    log.info(&format!("prompts: {} files", inventory.prompts.len()));
    log.info(&format!(
        "MCP config: {}",
        if inventory.has_mcp_config() {
            "yes"
        } else {
            "no"
        }
    ));

    let skipped = report.deployed.count(FileStatus::Skipped);
    if skipped > 0 {
        log.warn(&format!(
            "{skipped} file(s) differ from the templates and were kept; use --force to overwrite"
        ));
    }
    Ok(())
}
