//! Command: show the detected platform.
use anyhow::Result;

use crate::cli::{DetectPlatformOpts, GlobalOpts};
use crate::exec::SystemExecutor;
use crate::logging::Logger;
use crate::platform::{KNOWN_TOOLS, PlatformContext};
use crate::workflow;

use super::CommandSetup;

/// Run the detect-platform command.
///
/// # Errors
///
/// Returns an error if settings cannot be resolved or JSON output fails.
pub fn run(global: &GlobalOpts, opts: &DetectPlatformOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let ctx = workflow::detect(&setup.settings, &SystemExecutor, log);

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&ctx)?);
    } else {
        for line in summary(&ctx) {
            log.info(&line);
        }
    }
    Ok(())
}

/// Human-readable description of `ctx`, one line per fact.
#[must_use]
pub fn summary(ctx: &PlatformContext) -> Vec<String> {
    let mark = |b: bool| if b { "yes" } else { "no" };
    let mut lines = vec![
        format!("OS: {} {}", ctx.os, ctx.os_version),
        format!("Architecture: {}", ctx.arch),
        format!("Python: {}", ctx.python_version),
        format!("User: {}", ctx.user),
        format!("Home: {}", ctx.home_dir),
        format!("Shell: {}", ctx.shell),
        format!("Conan home: {}", ctx.conan_home),
        format!("CI: {} ({})", mark(ctx.is_ci), ctx.ci_provider),
        format!("Rule template: {}", ctx.rule_template_name()),
        "Tools:".to_string(),
    ];
    lines.extend(
        KNOWN_TOOLS
            .iter()
            .map(|tool| format!("  {tool}: {}", mark(ctx.has_tool(tool)))),
    );
    lines
}
