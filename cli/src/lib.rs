//! Cursor IDE configuration orchestrator.
//!
//! Detects the host platform, renders the rule, prompt, and MCP server
//! templates that match it, and deploys the result into a project's
//! `.cursor/` directory.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: resolve settings from flags, environment, and `orchestrator.toml`
//! - **[`platform`]**: OS, CI, and tool detection
//! - **[`templates`]**: template catalog, rendering, and frontmatter checks
//! - **[`plan`]**: turn a catalog and a platform into a deployment plan
//! - **[`export`]**: write a plan to disk or serialize it as a bundle
//! - **[`workflow`]**: the deployment state machine tying the layers together
//! - **[`commands`]**: top-level subcommand orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod export;
pub mod logging;
pub mod plan;
pub mod platform;
pub mod resources;
pub mod templates;
pub mod workflow;

/// Version string baked in at build time, falling back to the package version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("ORCHESTRATOR_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}
