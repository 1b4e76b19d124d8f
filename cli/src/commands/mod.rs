pub mod check_env;
pub mod deploy;
pub mod detect_platform;
pub mod export_config;
pub mod show_config;
pub mod validate;
pub mod version;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::{EnvSnapshot, Settings};
use crate::logging::Log;

/// Shared state produced by the common command setup sequence.
///
/// Captures the environment once and resolves settings from flags,
/// environment, and `orchestrator.toml` so each command does not repeat it.
#[derive(Debug)]
pub struct CommandSetup {
    pub settings: Settings,
}

impl CommandSetup {
    /// Resolve settings for this invocation.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory cannot be read or the
    /// config file is invalid.
    pub fn init(global: &GlobalOpts, log: &dyn Log) -> Result<Self> {
        let cwd = std::env::current_dir().context("cannot read the current directory")?;
        let exe = std::env::current_exe().ok();
        Self::from_parts(global, EnvSnapshot::capture(), &cwd, exe.as_deref(), log)
    }

    /// Resolve settings from explicit inputs.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is invalid.
    pub fn from_parts(
        global: &GlobalOpts,
        env: EnvSnapshot,
        cwd: &std::path::Path,
        exe: Option<&std::path::Path>,
        log: &dyn Log,
    ) -> Result<Self> {
        let settings = Settings::resolve(&global.overrides(), env, cwd, exe)?;

        log.debug(&format!("root: {}", settings.root.display()));
        log.debug(&format!("cursor dir: {}", settings.cursor_dir.display()));
        if settings.config_file.is_file() {
            log.debug(&format!("config file: {}", settings.config_file.display()));
        }
        match &settings.templates_dir {
            Some(dir) => log.debug(&format!("templates: {}", dir.display())),
            None => log.debug("templates: not found"),
        }

        Ok(Self { settings })
    }
}
