//! Template discovery.
//!
//! Every `*.jinja2` file below the template directory becomes a
//! [`TemplateDescriptor`]. The layer comes from the file's location:
//!
//! | Source                         | Layer            |
//! |--------------------------------|------------------|
//! | `rules/shared.*`               | shared           |
//! | `rules/<os>-dev.*`             | platform `<os>`  |
//! | `rules/ci.*`, `rules/ci-<os>.*`| ci               |
//! | anything else                  | shared           |
//!
//! An optional `catalog.toml` beside the templates restricts templates to
//! project types, declares extra required variables, or redirects a target:
//!
//! ```toml
//! [templates."rules/fips.mdc"]
//! project_types = ["openssl"]
//! required = ["project_name"]
//! target = "rules/security.mdc"
//! ```
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use super::{Layer, TEMPLATE_EXTENSION, TemplateDescriptor, TemplateKind, display_path};
use super::{renderer, strip_template_extension};
use crate::config::toml_loader::load_config;
use crate::error::ConfigError;
use crate::platform::Os;

/// Name of the optional metadata file.
pub const METADATA_FILE: &str = "catalog.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Metadata {
    templates: BTreeMap<String, Entry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Entry {
    project_types: Vec<String>,
    required: Vec<String>,
    target: Option<PathBuf>,
}

/// The templates available for a run. Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    templates: Vec<TemplateDescriptor>,
    warnings: Vec<String>,
}

impl Catalog {
    /// Load every template under `dir`.
    ///
    /// Templates that fail to parse are still listed; the syntax error
    /// surfaces when they are rendered.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` is missing, a template cannot be read, or
    /// `catalog.toml` is invalid or names an unknown template.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        if !dir.is_dir() {
            return Err(ConfigError::TemplatesNotFound);
        }

        let mut sources = Vec::new();
        collect_templates(dir, dir, &mut sources)?;
        sources.sort();

        let mut metadata: Metadata = load_config(&dir.join(METADATA_FILE))?;
        let mut warnings = Vec::new();
        let mut templates = Vec::with_capacity(sources.len());

        for rel in sources {
            let source_path = dir.join(&rel);
            let source =
                std::fs::read_to_string(&source_path).map_err(|source| ConfigError::Io {
                    path: source_path.clone(),
                    source,
                })?;

            let target = output_path(&rel);
            let id = display_path(&target);
            let entry = metadata.templates.remove(&id).unwrap_or_default();
            let target = match entry.target {
                Some(redirect) => checked_target(&id, redirect)?,
                None => target,
            };

            let mut required_variables = match renderer::undeclared_variables(&id, &source) {
                Ok(vars) => vars,
                Err(e) => {
                    warnings.push(e.to_string());
                    BTreeSet::new()
                }
            };
            required_variables.extend(entry.required);

            templates.push(TemplateDescriptor {
                layer: classify(&target),
                target,
                id,
                source_path,
                project_types: entry.project_types,
                required_variables,
                kind: TemplateKind::Jinja,
                source,
            });
        }

        if let Some(unknown) = metadata.templates.keys().next() {
            return Err(ConfigError::InvalidValue {
                key: format!("{METADATA_FILE} [templates]"),
                value: unknown.clone(),
                expected: "the id of a template in the catalog".to_string(),
            });
        }

        Ok(Self {
            templates,
            warnings,
        })
    }

    /// Build a catalog from descriptors that are already in memory.
    #[must_use]
    pub fn from_templates(mut templates: Vec<TemplateDescriptor>) -> Self {
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        Self {
            templates,
            warnings: Vec::new(),
        }
    }

    /// All templates, sorted by id.
    #[must_use]
    pub fn templates(&self) -> &[TemplateDescriptor] {
        &self.templates
    }

    /// Look up a template by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TemplateDescriptor> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Problems found while loading that did not stop the load.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// A `target` redirect must stay below the `.cursor` directory.
fn checked_target(id: &str, target: PathBuf) -> Result<PathBuf, ConfigError> {
    let inside = !target.as_os_str().is_empty()
        && target
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if inside {
        Ok(target)
    } else {
        Err(ConfigError::InvalidValue {
            key: format!("{METADATA_FILE} [templates.\"{id}\"] target"),
            value: target.display().to_string(),
            expected: "a relative path inside the .cursor directory".to_string(),
        })
    }
}

/// Recursively gather template paths relative to `base`.
fn collect_templates(base: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ConfigError> {
    let io = |source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
    };
    for entry in std::fs::read_dir(dir).map_err(io)? {
        let path = entry.map_err(io)?.path();
        if path.is_dir() {
            collect_templates(base, &path, out)?;
        } else if path
            .extension()
            .is_some_and(|e| e == TEMPLATE_EXTENSION)
            && let Ok(rel) = path.strip_prefix(base)
        {
            out.push(rel.to_path_buf());
        }
    }
    Ok(())
}

/// `rules/shared.mdc.jinja2` to `rules/shared.mdc`.
fn output_path(rel: &Path) -> PathBuf {
    let name = rel
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(strip_template_extension)
        .unwrap_or_default();
    rel.with_file_name(name)
}

/// Layer implied by a template's output path.
fn classify(target: &Path) -> Layer {
    let in_rules = target
        .parent()
        .is_some_and(|p| p.file_name().is_some_and(|n| n == "rules"));
    if !in_rules {
        return Layer::Shared;
    }

    let stem = target
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    if stem == "ci" {
        return Layer::Ci(None);
    }
    if let Some(os) = stem.strip_prefix("ci-") {
        return Layer::Ci(os.parse::<Os>().ok());
    }
    if let Some(os) = stem.strip_suffix("-dev").and_then(|s| s.parse::<Os>().ok()) {
        return Layer::Platform(os);
    }
    Layer::Shared
}
