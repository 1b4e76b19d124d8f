//! Command: export the configuration as a bundle or profile.
use std::path::Path;

use anyhow::{Result, bail};

use crate::cli::{ExportConfigOpts, GlobalOpts};
use crate::config::Settings;
use crate::exec::{Executor, SystemExecutor};
use crate::export::{self, ExportMetadata};
use crate::logging::{Log, Logger};
use crate::resources::helpers::fs::atomic_write;
use crate::templates::Renderer;
use crate::workflow;

use super::CommandSetup;

/// Run the export-config command.
///
/// # Errors
///
/// See [`export_with`].
pub fn run(global: &GlobalOpts, opts: &ExportConfigOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    export_with(&setup.settings, opts, &SystemExecutor, log)
}

/// Export with resolved settings.
///
/// Without `--installed` the templates are rendered for this host exactly
/// as `deploy` would, but nothing under `.cursor` is written. With
/// `--dry-run` the output file is not written either.
///
/// # Errors
///
/// Returns an error if planning or rendering fails, there is nothing to
/// export, or the output file exists (without `--force`) or cannot be written.
pub fn export_with(
    settings: &Settings,
    opts: &ExportConfigOpts,
    executor: &dyn Executor,
    log: &dyn Log,
) -> Result<()> {
    let ctx = workflow::detect(settings, executor, log);
    let metadata = ExportMetadata::new(&ctx, &settings.project_type, chrono::Utc::now());

    let bundle = if opts.installed {
        if !settings.cursor_dir.is_dir() {
            bail!(
                "no Cursor configuration found at {}",
                settings.cursor_dir.display()
            );
        }
        export::snapshot(&settings.cursor_dir, metadata)?
    } else {
        let plan = workflow::prepare(settings, &ctx, log)?;
        if plan.opted_out {
            log.info("export skipped: opted out");
            return Ok(());
        }
        export::export(&plan, &Renderer::new(), metadata)?
    };

    let text = bundle.render(opts.format)?;
    match &opts.output {
        Some(path) => {
            write_output(path, &text, settings, log)?;
            if !settings.options.dry_run {
                log.info(&format!(
                    "exported {} files to {}",
                    bundle.files.len(),
                    path.display()
                ));
            }
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn write_output(path: &Path, text: &str, settings: &Settings, log: &dyn Log) -> Result<()> {
    let exists = path.exists();
    if exists && !settings.options.force {
        bail!(
            "export path already exists: {} (use --force to overwrite)",
            path.display()
        );
    }
    if settings.options.dry_run {
        let verb = if exists { "replace" } else { "create" };
        log.dry_run(&format!(
            "would {verb} {} ({} bytes)",
            path.display(),
            text.len()
        ));
        return Ok(());
    }
    atomic_write(path, text.as_bytes())?;
    Ok(())
}
