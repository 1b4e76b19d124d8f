//! Run configuration.
//!
//! All environment lookups happen here, once, at the start of a run.
//! [`Settings::resolve`] layers command-line overrides over environment
//! variables over `orchestrator.toml` over built-in defaults and produces
//! the explicit [`Settings`] every later stage consumes.
pub mod env;
pub mod project_types;
pub mod toml_loader;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use env::EnvSnapshot;

use crate::error::ConfigError;
use crate::plan::{DeployOptions, PrecedencePolicy};

/// Values supplied on the command line. `None` and empty mean "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Target repository root.
    pub root: Option<PathBuf>,
    /// Template directory.
    pub templates: Option<PathBuf>,
    /// Project type.
    pub project_type: Option<String>,
    /// Platform override.
    pub platform: Option<String>,
    /// CI override.
    pub ci: Option<bool>,
    /// Overwrite files that differ from the rendered output.
    pub force: bool,
    /// Extra rule files with the highest precedence.
    pub custom_rules: Vec<PathBuf>,
    /// Skip deployment entirely.
    pub opt_out: bool,
    /// Report without writing.
    pub dry_run: bool,
    /// CI versus platform precedence.
    pub precedence: Option<PrecedencePolicy>,
    /// `key=value` template variables.
    pub variables: Vec<(String, String)>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Target repository root.
    pub root: PathBuf,
    /// Output directory, normally `<root>/.cursor`.
    pub cursor_dir: PathBuf,
    /// Template directory, if one could be located.
    pub templates_dir: Option<PathBuf>,
    /// Config file consulted (it may not exist).
    pub config_file: PathBuf,
    /// Selected project type.
    pub project_type: String,
    /// Raw platform override handed to the detector.
    pub platform_override: Option<String>,
    /// Raw CI override handed to the detector.
    pub ci_override: Option<String>,
    /// Deployment options consumed by the planner and exporter.
    pub options: DeployOptions,
    /// User-supplied template variables.
    pub variables: BTreeMap<String, String>,
    /// Environment captured at startup.
    pub env: EnvSnapshot,
}

impl Settings {
    /// Resolve settings from the command line, environment, and config file.
    ///
    /// `cwd` is the fallback root; `exe` is the running binary, used to find
    /// templates installed beside it.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or a
    /// value in it is invalid.
    pub fn resolve(
        overrides: &Overrides,
        env: EnvSnapshot,
        cwd: &Path,
        exe: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let root = overrides.root.clone().unwrap_or_else(|| cwd.to_path_buf());
        let root = if root.is_absolute() {
            root
        } else {
            cwd.join(root)
        };
        let root = dunce::canonicalize(&root).unwrap_or(root);

        let config_file = env
            .get(env::CONFIG)
            .map_or_else(|| root.join(toml_loader::FILE_NAME), |p| root.join(p));
        let file = toml_loader::load_config::<toml_loader::FileConfig>(&config_file)?
            .rebased(config_file.parent().unwrap_or(&root));

        let cursor_dir = env
            .get(env::CURSOR_CONFIG_PATH)
            .map_or_else(|| root.join(".cursor"), |p| root.join(p));

        let templates_dir = overrides
            .templates
            .as_ref()
            .map(|p| cwd.join(p))
            .or_else(|| env.get(env::CURSOR_RULES_PATH).map(|p| cwd.join(p)))
            .or_else(|| file.templates.clone())
            .or_else(|| find_templates(cwd, exe));

        let precedence = match (overrides.precedence, file.ci_precedence.as_deref()) {
            (Some(p), _) => p,
            (None, Some(raw)) => {
                raw.parse::<PrecedencePolicy>()
                    .map_err(|expected| ConfigError::InvalidValue {
                        key: "ci_precedence".to_string(),
                        value: raw.to_string(),
                        expected,
                    })?
            }
            (None, None) => PrecedencePolicy::default(),
        };

        let mut custom_rules = file.custom_rules.clone();
        custom_rules.extend(overrides.custom_rules.iter().map(|p| cwd.join(p)));

        let mut variables = file.variables.clone();
        variables.extend(overrides.variables.iter().cloned());

        let options = DeployOptions {
            force: overrides.force,
            custom_rules,
            opt_out: overrides.opt_out || env.flag(env::OPT_OUT),
            dry_run: overrides.dry_run,
            precedence,
        };

        Ok(Self {
            root,
            cursor_dir,
            templates_dir,
            config_file,
            project_type: overrides
                .project_type
                .clone()
                .or(file.project_type)
                .unwrap_or_else(|| project_types::DEFAULT_PROJECT_TYPE.to_string()),
            platform_override: overrides
                .platform
                .clone()
                .or_else(|| env.get(env::PLATFORM).map(ToString::to_string)),
            ci_override: overrides
                .ci
                .map(|b| b.to_string())
                .or_else(|| env.get(env::CI).map(ToString::to_string)),
            options,
            variables,
            env,
        })
    }

    /// The template directory, or an error naming how to set one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TemplatesNotFound`] if no directory was located.
    pub fn templates_dir(&self) -> Result<&Path, ConfigError> {
        self.templates_dir
            .as_deref()
            .ok_or(ConfigError::TemplatesNotFound)
    }
}

/// Locate the shipped templates relative to the binary or working directory.
fn find_templates(cwd: &Path, exe: Option<&Path>) -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(parent) = exe.and_then(Path::parent) {
        candidates.push(parent.join("../../templates/cursor-rules")); // target/release/
        candidates.push(parent.join("../templates/cursor-rules")); // bin/
        candidates.push(parent.join("../share/mcp-orchestrator/templates/cursor-rules"));
    }
    candidates.push(cwd.join("templates/cursor-rules"));
    // Development builds also look in the source tree.
    #[cfg(debug_assertions)]
    candidates.push(Path::new(env!("CARGO_MANIFEST_DIR")).join("templates/cursor-rules"));

    candidates
        .into_iter()
        .find(|c| c.is_dir())
        .map(|c| dunce::canonicalize(&c).unwrap_or(c))
}

/// Parse a `key=value` pair.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] when there is no `=` or the key is empty.
pub fn parse_variable(raw: &str) -> Result<(String, String), ConfigError> {
    match raw.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(ConfigError::InvalidValue {
            key: "--var".to_string(),
            value: raw.to_string(),
            expected: "key=value".to_string(),
        }),
    }
}
