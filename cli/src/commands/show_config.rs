//! Command: show what is currently deployed.
use anyhow::Result;

use crate::cli::{GlobalOpts, ShowConfigOpts};
use crate::export::{Inventory, McpConfig};
use crate::logging::Logger;

use super::CommandSetup;

/// Run the show-config command.
///
/// # Errors
///
/// Returns an error if settings cannot be resolved or JSON output fails.
pub fn run(global: &GlobalOpts, opts: &ShowConfigOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let inventory = Inventory::scan(&setup.settings.cursor_dir);

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&inventory)?);
        return Ok(());
    }

    if !inventory.exists {
        log.warn(&format!(
            "no Cursor configuration at {}; run `mcp-orchestrator deploy`",
            inventory.cursor_dir.display()
        ));
        return Ok(());
    }

    log.stage(&format!("Cursor configuration: {}", inventory.cursor_dir.display()));
    for line in summary(&inventory) {
        log.info(&line);
    }
    Ok(())
}

/// Human-readable description of `inventory`.
#[must_use]
pub fn summary(inventory: &Inventory) -> Vec<String> {
    let mut lines = vec![format!("rules: {}", inventory.rules.len())];
    lines.extend(inventory.rules.iter().map(|r| format!("  {r}.mdc")));
    lines.push(format!("prompts: {}", inventory.prompts.len()));
    lines.extend(inventory.prompts.iter().map(|p| format!("  {p}.md")));
    match &inventory.mcp {
        McpConfig::Missing => lines.push("MCP config: missing".to_string()),
        McpConfig::Valid { servers } => {
            lines.push(format!("MCP config: {} servers", servers.len()));
            lines.extend(servers.iter().map(|s| format!("  {s}")));
        }
        McpConfig::Invalid { message } => lines.push(format!("MCP config: invalid ({message})")),
    }
    lines.push(format!("ignore entries: {}", inventory.ignore_entries.len()));
    lines
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn summary_lists_contents() {
        let inventory = Inventory {
            cursor_dir: PathBuf::from(".cursor"),
            exists: true,
            rules: vec!["linux-dev".into(), "shared".into()],
            prompts: vec![],
            mcp: McpConfig::Valid {
                servers: vec!["openssl-context".into()],
            },
            ignore_entries: vec!["*.log".into()],
        };
        insta::assert_snapshot!(summary(&inventory).join("\n"), @r"
        rules: 2
          linux-dev.mdc
          shared.mdc
        prompts: 0
        MCP config: 1 servers
          openssl-context
        ignore entries: 1
        ");
    }
}
