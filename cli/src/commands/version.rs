//! Command: print version information.

/// Print the orchestrator version to stdout.
pub fn run() {
    println!("mcp-orchestrator {}", crate::version());
}
