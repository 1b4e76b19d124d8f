//! Deployment planning.
//!
//! [`plan`] decides which templates a run materializes and with which
//! variables. Layers are applied lowest precedence first so that when two
//! templates share a target the later one replaces the earlier:
//!
//! ```text
//! shared < platform < ci < custom        (PrecedencePolicy::CiOverPlatform)
//! shared < ci < platform < custom        (PrecedencePolicy::PlatformOverCi)
//! ```
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::project_types::{self, ProjectType};
use crate::error::{DeployError, PlanError};
use crate::platform::PlatformContext;
use crate::templates::renderer::{Variables, first_missing};
use crate::templates::{Catalog, Layer, TemplateDescriptor};

/// Ignore patterns written for every deployment.
pub const LOCAL_ONLY_PATTERNS: &[&str] = &["*.log", "*.cache", ".cursor-session", "rules/custom/"];

/// Which of the CI and platform layers wins a shared target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrecedencePolicy {
    /// CI templates replace platform templates.
    #[default]
    CiOverPlatform,
    /// Platform templates replace CI templates.
    PlatformOverCi,
}

impl PrecedencePolicy {
    /// Rank of `layer`; higher ranks are applied later and win.
    #[must_use]
    pub const fn rank(self, layer: &Layer) -> u8 {
        match (layer, self) {
            (Layer::Shared, _) => 0,
            (Layer::Platform(_), Self::CiOverPlatform) | (Layer::Ci(_), Self::PlatformOverCi) => 1,
            (Layer::Ci(_), Self::CiOverPlatform) | (Layer::Platform(_), Self::PlatformOverCi) => 2,
            (Layer::Custom, _) => 3,
        }
    }
}

impl fmt::Display for PrecedencePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CiOverPlatform => write!(f, "ci"),
            Self::PlatformOverCi => write!(f, "platform"),
        }
    }
}

impl FromStr for PrecedencePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ci" | "ci-over-platform" => Ok(Self::CiOverPlatform),
            "platform" | "platform-over-ci" => Ok(Self::PlatformOverCi),
            _ => Err("'ci' or 'platform'".to_string()),
        }
    }
}

/// Options for one deployment, resolved once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployOptions {
    /// Overwrite files whose content differs from the rendered output.
    pub force: bool,
    /// Extra rule files, applied last.
    pub custom_rules: Vec<PathBuf>,
    /// Skip deployment entirely.
    pub opt_out: bool,
    /// Report the plan without writing.
    pub dry_run: bool,
    /// CI versus platform precedence.
    pub precedence: PrecedencePolicy,
}

/// A template selected for output together with its variables.
#[derive(Debug, Clone)]
pub struct PlannedFile {
    /// The template.
    pub descriptor: TemplateDescriptor,
    /// Variables it is rendered with.
    pub variables: Variables,
}

/// A template that was selected and then replaced by a higher layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    /// Shared target path.
    pub target: String,
    /// Template that is deployed.
    pub kept: String,
    /// Template that is discarded.
    pub replaced: String,
}

impl Conflict {
    /// The conflict as a reportable error.
    #[must_use]
    pub fn to_error(&self) -> DeployError {
        DeployError::ConflictingTarget {
            target: self.target.clone(),
            kept: self.kept.clone(),
            replaced: self.replaced.clone(),
        }
    }
}

/// The resolved, ordered set of files one run materializes.
#[derive(Debug, Clone, Default)]
pub struct DeploymentPlan {
    /// Project type the plan was built for.
    pub project_type: String,
    /// Files to produce, in application order.
    pub files: Vec<PlannedFile>,
    /// Targets replaced by a higher-precedence template.
    pub conflicts: Vec<Conflict>,
    /// Entries for the generated ignore file.
    pub ignore_entries: Vec<String>,
    /// Options the plan was built with.
    pub options: DeployOptions,
    /// Whether the user opted out; the plan is then empty.
    pub opted_out: bool,
}

impl DeploymentPlan {
    /// Whether the plan produces nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Target paths in application order.
    pub fn targets(&self) -> impl Iterator<Item = String> + '_ {
        self.files.iter().map(|f| f.descriptor.target_display())
    }
}

/// Variables every template sees: the platform's, the project type's, then
/// the user's, later sources replacing earlier ones.
#[must_use]
pub fn build_variables(
    ctx: &PlatformContext,
    project: &ProjectType,
    overrides: &BTreeMap<String, String>,
) -> Variables {
    let mut vars = ctx.to_variables();
    vars.insert("project_type".to_string(), project.name.into());
    vars.insert("project_title".to_string(), project.title.into());
    vars.insert(
        "project_description".to_string(),
        project.description.into(),
    );
    vars.insert("mcp_servers".to_string(), project.mcp_servers.into());
    for (k, v) in overrides {
        vars.insert(k.clone(), v.clone().into());
    }
    vars
}

/// Build the deployment plan for `project_type` on the host described by `ctx`.
///
/// Opting out yields an empty plan, not an error.
///
/// # Errors
///
/// - [`PlanError::UnknownProjectType`] if `project_type` is not known
/// - [`PlanError::CustomRule`] if a custom rule cannot be read
/// - [`PlanError::MissingVariable`] if a selected template needs a variable
///   no source provides; nothing has been written at that point
pub fn plan(
    project_type: &str,
    ctx: &PlatformContext,
    options: &DeployOptions,
    catalog: &Catalog,
    overrides: &BTreeMap<String, String>,
) -> Result<DeploymentPlan, PlanError> {
    if options.opt_out {
        return Ok(DeploymentPlan {
            project_type: project_type.to_string(),
            options: options.clone(),
            opted_out: true,
            ..DeploymentPlan::default()
        });
    }

    let project = project_types::lookup(project_type)?;
    let variables = build_variables(ctx, project, overrides);

    let mut generated: Vec<&TemplateDescriptor> = catalog
        .templates()
        .iter()
        .filter(|t| t.serves(project.name) && t.layer.applies_to(ctx))
        .collect();
    // Stable: ids stay sorted within a layer.
    generated.sort_by_key(|t| options.precedence.rank(&t.layer));

    let custom = options
        .custom_rules
        .iter()
        .map(|p| TemplateDescriptor::custom(p))
        .collect::<Result<Vec<_>, _>>()?;

    let mut files: Vec<PlannedFile> = Vec::new();
    let mut conflicts = Vec::new();
    for descriptor in generated.into_iter().cloned().chain(custom) {
        if let Some(pos) = files
            .iter()
            .position(|f| f.descriptor.target == descriptor.target)
        {
            let replaced = files.remove(pos);
            conflicts.push(Conflict {
                target: descriptor.target_display(),
                kept: descriptor.id.clone(),
                replaced: replaced.descriptor.id,
            });
        }
        files.push(PlannedFile {
            descriptor,
            variables: variables.clone(),
        });
    }

    for file in &files {
        if let Some(variable) = first_missing(&file.descriptor.required_variables, &file.variables)
        {
            return Err(PlanError::MissingVariable {
                template: file.descriptor.id.clone(),
                variable: variable.to_string(),
            });
        }
    }

    let mut ignore_entries: Vec<String> =
        LOCAL_ONLY_PATTERNS.iter().map(ToString::to_string).collect();
    ignore_entries.extend(
        files
            .iter()
            .filter(|f| f.descriptor.layer == Layer::Custom)
            .map(|f| f.descriptor.target_display()),
    );

    Ok(DeploymentPlan {
        project_type: project.name.to_string(),
        files,
        conflicts,
        ignore_entries,
        options: options.clone(),
        opted_out: false,
    })
}
