//! Template catalog and rendering.
//!
//! A [`TemplateDescriptor`] describes one file the orchestrator can produce:
//! where its source lives, where it lands under the `.cursor` directory, which
//! hosts it applies to, and which variables it needs. The [`catalog`] builds
//! descriptors from a template directory; the [`renderer`] turns a descriptor
//! and a variable map into text.
pub mod catalog;
pub mod frontmatter;
pub mod renderer;

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::PlanError;
use crate::platform::{Os, PlatformContext};

pub use catalog::Catalog;
pub use renderer::Renderer;

/// Extension marking a file as a template.
pub const TEMPLATE_EXTENSION: &str = "jinja2";

/// Precedence tier a template belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "os")]
pub enum Layer {
    /// Deployed on every host.
    Shared,
    /// Deployed when the host runs the given OS.
    Platform(Os),
    /// Deployed on CI runners, optionally only for one OS.
    Ci(Option<Os>),
    /// Supplied by the user with `--custom-rules`.
    Custom,
}

impl Layer {
    /// Whether templates of this layer apply to `ctx`.
    #[must_use]
    pub fn applies_to(&self, ctx: &PlatformContext) -> bool {
        match self {
            Self::Shared | Self::Custom => true,
            Self::Platform(os) => ctx.os == *os,
            Self::Ci(None) => ctx.is_ci,
            Self::Ci(Some(os)) => ctx.is_ci && ctx.os == *os,
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared => write!(f, "shared"),
            Self::Platform(os) => write!(f, "platform:{os}"),
            Self::Ci(None) => write!(f, "ci"),
            Self::Ci(Some(os)) => write!(f, "ci:{os}"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// How a template source becomes output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    /// Rendered with the template engine.
    Jinja,
    /// Copied unchanged.
    Verbatim,
}

/// One file the orchestrator can produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateDescriptor {
    /// Stable identifier, e.g. `rules/shared.mdc` or `custom:team.mdc`.
    pub id: String,
    /// Where the template source was read from.
    pub source_path: PathBuf,
    /// Output path relative to the `.cursor` directory.
    pub target: PathBuf,
    /// Precedence tier, which also decides applicability.
    pub layer: Layer,
    /// Project types this template is limited to; empty means all.
    pub project_types: Vec<String>,
    /// Variables that must be present to render.
    pub required_variables: BTreeSet<String>,
    /// Rendering mode.
    pub kind: TemplateKind,
    /// Template text, loaded once.
    #[serde(skip)]
    pub source: String,
}

impl TemplateDescriptor {
    /// Whether this template is selected for `project_type`.
    #[must_use]
    pub fn serves(&self, project_type: &str) -> bool {
        self.project_types.is_empty() || self.project_types.iter().any(|p| p == project_type)
    }

    /// Whether the rendered output must be valid JSON.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.target
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"))
    }

    /// Target path as a forward-slash string for logs and bundles.
    #[must_use]
    pub fn target_display(&self) -> String {
        display_path(&self.target)
    }

    /// Build a descriptor for a user-supplied rule file.
    ///
    /// `team.mdc.jinja2` is rendered and `team.mdc` is copied; both land at
    /// `rules/team.mdc`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::CustomRule`] if the file does not exist, cannot be
    /// read, has no usable name, or is a template that does not parse.
    pub fn custom(path: &Path) -> Result<Self, PlanError> {
        let reject = |reason: &str| PlanError::CustomRule {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        if !path.is_file() {
            return Err(reject("file not found"));
        }
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| reject("file name is not valid UTF-8"))?;
        let source = std::fs::read_to_string(path).map_err(|e| reject(&e.to_string()))?;

        let (output_name, kind) = match strip_template_extension(file_name) {
            Some(stem) => (stem, TemplateKind::Jinja),
            None => (file_name, TemplateKind::Verbatim),
        };
        if output_name.is_empty() {
            return Err(reject("empty rule name"));
        }

        let id = format!("custom:{output_name}");
        let required_variables = match kind {
            TemplateKind::Jinja => renderer::undeclared_variables(&id, &source)
                .map_err(|e| reject(&e.to_string()))?,
            TemplateKind::Verbatim => BTreeSet::new(),
        };

        Ok(Self {
            id,
            source_path: path.to_path_buf(),
            target: Path::new("rules").join(output_name),
            layer: Layer::Custom,
            project_types: Vec::new(),
            required_variables,
            kind,
            source,
        })
    }
}

/// `name.ext.jinja2` to `name.ext`; `None` if `file_name` is not a template.
#[must_use]
pub fn strip_template_extension(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(TEMPLATE_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))
}

/// Render a relative path with forward slashes on every platform.
#[must_use]
pub fn display_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
