//! The deploy state machine.
//!
//! ```text
//! Detecting -> Planning -> (Rendering -> Writing)* -> Done
//!                  |            |           |
//!                  +------------+-----------+--> Failed
//! ```
//!
//! A [`DeployRun`] records every state it passes through so callers and
//! tests can see how far a deployment got. Files written before a failure
//! stay on disk.
use std::fmt;

use serde::Serialize;

use crate::config::Settings;
use crate::config::project_types;
use crate::error::OrchestratorError;
use crate::exec::Executor;
use crate::export::{self, DeployedConfig};
use crate::logging::Log;
use crate::plan::{self, DeploymentPlan};
use crate::platform::{PlatformContext, PlatformDetector};
use crate::templates::{Catalog, Renderer};

/// A stage of one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployState {
    /// Reading the host.
    Detecting,
    /// Loading templates and building the plan.
    Planning,
    /// Rendering one file.
    Rendering,
    /// Writing one file.
    Writing,
    /// Finished successfully.
    Done,
    /// Stopped on an error.
    Failed,
}

impl DeployState {
    /// Whether no further transitions happen.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `self -> next` is a legal transition.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Detecting, Self::Planning)
                | (Self::Planning, Self::Rendering | Self::Done | Self::Failed)
                | (Self::Rendering, Self::Writing | Self::Failed)
                | (Self::Writing, Self::Rendering | Self::Done | Self::Failed)
        )
    }
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Detecting => "DETECTING",
            Self::Planning => "PLANNING",
            Self::Rendering => "RENDERING",
            Self::Writing => "WRITING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Everything a successful deployment produced.
#[derive(Debug, Clone)]
pub struct DeployReport {
    /// The host the plan was built for.
    pub context: PlatformContext,
    /// The plan that was applied.
    pub plan: DeploymentPlan,
    /// What ended up on disk.
    pub deployed: DeployedConfig,
}

/// One pass through the deploy state machine.
#[derive(Debug, Clone)]
pub struct DeployRun {
    state: DeployState,
    history: Vec<DeployState>,
}

impl Default for DeployRun {
    fn default() -> Self {
        Self::new()
    }
}

impl DeployRun {
    /// A run about to detect the platform.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: DeployState::Detecting,
            history: vec![DeployState::Detecting],
        }
    }

    /// A run that starts after detection, for callers that build the plan
    /// themselves and only need [`export::apply`].
    #[must_use]
    pub fn planning() -> Self {
        Self {
            state: DeployState::Planning,
            history: vec![DeployState::Planning],
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> DeployState {
        self.state
    }

    /// Every state entered so far, in order.
    #[must_use]
    pub fn history(&self) -> &[DeployState] {
        &self.history
    }

    /// Move to `next`.
    ///
    /// Transitions are driven by this module and [`export::apply`] only, so
    /// an illegal one is a bug; it is logged and applied anyway.
    pub fn transition_to(&mut self, next: DeployState, log: &dyn Log) {
        if self.state.can_advance_to(next) {
            log.debug(&format!("state {} -> {next}", self.state));
        } else {
            log.warn(&format!("unexpected state change {} -> {next}", self.state));
        }
        self.state = next;
        self.history.push(next);
    }

    /// Run a full deployment: detect, plan, render and write.
    ///
    /// # Errors
    ///
    /// Returns the first configuration, planning, rendering, or write error;
    /// the run is then in [`DeployState::Failed`].
    pub fn execute(
        &mut self,
        settings: &Settings,
        executor: &dyn Executor,
        log: &dyn Log,
    ) -> Result<DeployReport, OrchestratorError> {
        log.stage("Detecting platform");
        let context = detect(settings, executor, log);

        self.transition_to(DeployState::Planning, log);
        log.stage("Planning deployment");
        let plan = match prepare(settings, &context, log) {
            Ok(plan) => plan,
            Err(e) => {
                self.transition_to(DeployState::Failed, log);
                return Err(e);
            }
        };

        if plan.opted_out {
            log.info("deployment skipped: opted out");
        } else {
            log.stage(if plan.options.dry_run {
                "Deploying (dry run)"
            } else {
                "Deploying"
            });
        }
        let renderer = Renderer::new();
        let deployed = export::apply(&plan, &renderer, &settings.cursor_dir, log, self)?;

        self.transition_to(DeployState::Done, log);
        Ok(DeployReport {
            context,
            plan,
            deployed,
        })
    }
}

/// Run a full deployment with a fresh [`DeployRun`].
///
/// # Errors
///
/// See [`DeployRun::execute`].
pub fn deploy(
    settings: &Settings,
    executor: &dyn Executor,
    log: &dyn Log,
) -> Result<DeployReport, OrchestratorError> {
    DeployRun::new().execute(settings, executor, log)
}

/// Detect the host, logging ambiguities as warnings.
#[must_use]
pub fn detect(settings: &Settings, executor: &dyn Executor, log: &dyn Log) -> PlatformContext {
    let (ctx, warnings) = PlatformDetector::new(&settings.env, executor)
        .with_overrides(
            settings.platform_override.as_deref(),
            settings.ci_override.as_deref(),
        )
        .detect_with_warnings();
    for warning in &warnings {
        log.warn(&warning.to_string());
    }
    log.info(&format!(
        "platform: {} {} ({}), ci: {}",
        ctx.os, ctx.os_version, ctx.arch, ctx.ci_provider
    ));
    log.debug(&format!(
        "tools: {}",
        ctx.available_tools
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    ));
    ctx
}

/// Load the catalog and build the plan for `ctx`.
///
/// An opted-out run returns the empty plan without touching the template
/// directory.
///
/// # Errors
///
/// Returns an error if the template directory cannot be found or loaded,
/// or planning fails.
pub fn prepare(
    settings: &Settings,
    ctx: &PlatformContext,
    log: &dyn Log,
) -> Result<DeploymentPlan, OrchestratorError> {
    let options = &settings.options;
    if options.opt_out {
        return Ok(plan::plan(
            &settings.project_type,
            ctx,
            options,
            &Catalog::default(),
            &settings.variables,
        )?);
    }

    let dir = settings.templates_dir()?;
    let catalog = Catalog::load(dir)?;
    log.info(&format!(
        "loaded {} templates from {}",
        catalog.len(),
        dir.display()
    ));
    for warning in catalog.warnings() {
        log.warn(warning);
    }

    let project = project_types::lookup(&settings.project_type)?;
    log.info(&format!("project type: {}", project.name));
    let env = project.check_env(&settings.env);
    for var in &env.missing_required {
        log.warn(&format!(
            "required environment variable {var} is not set for '{}'",
            project.name
        ));
    }

    let plan = plan::plan(project.name, ctx, options, &catalog, &settings.variables)?;
    for conflict in &plan.conflicts {
        log.warn(&conflict.to_error().to_string());
    }
    for target in plan.targets() {
        log.debug(&format!("planned {target}"));
    }
    log.info(&format!("{} files planned", plan.files.len()));
    log.debug(&format!("layer precedence: {}", options.precedence));
    Ok(plan)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::{EnvSnapshot, Overrides};
    use crate::exec::test_helpers::MockExecutor;
    use crate::logging::CapturingLog;
    use crate::resources::helpers::fs::list_files;
    use std::path::Path;

    fn templates(dir: &Path) {
        std::fs::create_dir_all(dir.join("rules")).unwrap();
        std::fs::write(
            dir.join("rules/shared.mdc.jinja2"),
            "---\ntitle: Shared\n---\nos={{ os }}\n",
        )
        .unwrap();
        std::fs::write(dir.join("rules/linux-dev.mdc.jinja2"), "linux\n").unwrap();
    }

    fn settings(root: &Path, overrides: Overrides) -> Settings {
        let tpl = root.join("tpl");
        templates(&tpl);
        let overrides = Overrides {
            root: Some(root.to_path_buf()),
            templates: Some(tpl),
            platform: Some("linux".to_string()),
            ci: Some(false),
            ..overrides
        };
        Settings::resolve(&overrides, EnvSnapshot::default(), root, None).unwrap()
    }

    #[test]
    fn transitions_follow_the_machine() {
        use DeployState::{Detecting, Done, Failed, Planning, Rendering, Writing};
        assert!(Detecting.can_advance_to(Planning));
        assert!(Planning.can_advance_to(Done));
        assert!(Rendering.can_advance_to(Failed));
        assert!(Writing.can_advance_to(Rendering));
        assert!(!Detecting.can_advance_to(Writing));
        assert!(!Done.can_advance_to(Planning));
        assert!(!Failed.can_advance_to(Rendering));
        assert!(Done.is_terminal() && Failed.is_terminal());
        assert!(!Writing.is_terminal());
    }

    #[test]
    fn successful_run_records_every_state() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), Overrides::default());
        let log = CapturingLog::default();
        let mut run = DeployRun::new();

        let report = run
            .execute(&settings, &MockExecutor::empty(), &log)
            .unwrap();

        assert_eq!(run.state(), DeployState::Done);
        assert_eq!(
            run.history(),
            [
                DeployState::Detecting,
                DeployState::Planning,
                DeployState::Rendering,
                DeployState::Writing,
                DeployState::Rendering,
                DeployState::Writing,
                DeployState::Done,
            ]
        );
        assert_eq!(report.plan.files.len(), 2);
        assert!(dir.path().join(".cursor/rules/shared.mdc").is_file());
        assert!(!log.contains("unexpected state change"));
    }

    #[test]
    fn planning_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(
            dir.path(),
            Overrides {
                project_type: Some("cobol".to_string()),
                ..Overrides::default()
            },
        );
        let mut run = DeployRun::new();

        let err = run
            .execute(&settings, &MockExecutor::empty(), &CapturingLog::default())
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::Plan(_)));
        assert_eq!(run.state(), DeployState::Failed);
        assert!(!dir.path().join(".cursor").exists());
    }

    #[test]
    fn opt_out_goes_straight_to_done() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(
            dir.path(),
            Overrides {
                opt_out: true,
                ..Overrides::default()
            },
        );
        let mut run = DeployRun::new();
        let report = run
            .execute(&settings, &MockExecutor::empty(), &CapturingLog::default())
            .unwrap();
        assert!(report.plan.opted_out);
        assert_eq!(
            run.history(),
            [DeployState::Detecting, DeployState::Planning, DeployState::Done]
        );
        assert!(list_files(&dir.path().join(".cursor")).unwrap().is_empty());
    }

    #[test]
    fn missing_required_env_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(
            dir.path(),
            Overrides {
                project_type: Some("openssl".to_string()),
                dry_run: true,
                ..Overrides::default()
            },
        );
        let log = CapturingLog::default();
        deploy(&settings, &MockExecutor::empty(), &log).unwrap();
        assert!(log.contains("warn: required environment variable CONAN_USER_HOME"));
    }
}
