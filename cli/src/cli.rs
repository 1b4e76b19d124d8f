use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Overrides, parse_variable};
use crate::export::ExportFormat;
use crate::plan::PrecedencePolicy;

/// Top-level CLI entry point for the orchestrator.
#[derive(Parser, Debug)]
#[command(
    name = "mcp-orchestrator",
    about = "Deploy platform-aware Cursor configuration into a repository",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Overwrite existing files whose content differs
    #[arg(short, long, global = true)]
    pub force: bool,

    /// Extra rule files to deploy last (`.mdc` or `.mdc.jinja2`)
    #[arg(long, global = true, value_delimiter = ',')]
    pub custom_rules: Vec<PathBuf>,

    /// Skip deployment entirely (also MCP_ORCHESTRATOR_OPT_OUT)
    #[arg(long, global = true)]
    pub opt_out: bool,

    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Target repository root (defaults to the current directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Template directory (also CURSOR_RULES_PATH)
    #[arg(long, global = true)]
    pub templates: Option<PathBuf>,

    /// Project type (generic, openssl)
    #[arg(short, long, global = true)]
    pub project_type: Option<String>,

    /// Treat the host as this platform (linux, macos, windows)
    #[arg(long, global = true)]
    pub platform: Option<String>,

    /// Treat the run as a CI run
    #[arg(long, global = true, conflicts_with = "no_ci")]
    pub ci: bool,

    /// Treat the run as a local run even on a CI runner
    #[arg(long, global = true)]
    pub no_ci: bool,

    /// Template variable, repeatable
    #[arg(long = "var", global = true, value_name = "KEY=VALUE", value_parser = parse_variable)]
    pub variables: Vec<(String, String)>,

    /// Which layer wins when CI and platform templates share a target (ci, platform)
    #[arg(long, global = true)]
    pub ci_precedence: Option<PrecedencePolicy>,
}

impl GlobalOpts {
    /// The command-line layer of the settings.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            root: self.root.clone(),
            templates: self.templates.clone(),
            project_type: self.project_type.clone(),
            platform: self.platform.clone(),
            ci: match (self.ci, self.no_ci) {
                (true, _) => Some(true),
                (false, true) => Some(false),
                (false, false) => None,
            },
            force: self.force,
            custom_rules: self.custom_rules.clone(),
            opt_out: self.opt_out,
            dry_run: self.dry_run,
            precedence: self.ci_precedence,
            variables: self.variables.clone(),
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render and write the Cursor configuration
    Deploy,
    /// Show what is currently deployed
    ShowConfig(ShowConfigOpts),
    /// Show the detected platform
    DetectPlatform(DetectPlatformOpts),
    /// Export the configuration as a bundle or profile
    ExportConfig(ExportConfigOpts),
    /// Check rule frontmatter
    Validate(ValidateOpts),
    /// Check project environment variables
    CheckEnv,
    /// Print version information
    Version,
}

impl Command {
    /// Name used for the log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Deploy => "deploy",
            Self::ShowConfig(_) => "show-config",
            Self::DetectPlatform(_) => "detect-platform",
            Self::ExportConfig(_) => "export-config",
            Self::Validate(_) => "validate",
            Self::CheckEnv => "check-env",
            Self::Version => "version",
        }
    }

    /// Whether the command prints machine-readable output on stdout.
    #[must_use]
    pub const fn is_machine_readable(&self) -> bool {
        match self {
            Self::ShowConfig(opts) => opts.json,
            Self::DetectPlatform(opts) => opts.json,
            Self::ExportConfig(opts) => opts.output.is_none(),
            _ => false,
        }
    }
}

/// Options for the `show-config` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct ShowConfigOpts {
    /// Print JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

/// Options for the `detect-platform` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct DetectPlatformOpts {
    /// Print JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

/// Options for the `export-config` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct ExportConfigOpts {
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
    pub format: ExportFormat,

    /// Bundle the deployed `.cursor` directory instead of rendering templates
    #[arg(long)]
    pub installed: bool,
}

/// Options for the `validate` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct ValidateOpts {
    /// Rule files to check (defaults to the deployed `.cursor/rules/*.mdc`)
    pub paths: Vec<PathBuf>,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}
