//! Template rendering with minijinja.
use std::collections::{BTreeMap, BTreeSet};

use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior};

use super::{TemplateDescriptor, TemplateKind};
use crate::error::TemplateError;

/// Template variables.
pub type Variables = BTreeMap<String, serde_json::Value>;

/// Names the engine resolves itself; never required from the caller.
const BUILTINS: &[&str] = &["range", "dict", "namespace", "debug", "loop", "self"];

/// Renders [`TemplateDescriptor`]s.
///
/// Output depends only on the descriptor and the variables passed in.
#[derive(Debug, Default, Clone, Copy)]
pub struct Renderer;

impl Renderer {
    /// Create a renderer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Render `descriptor` with `vars`. Extra variables are ignored.
    ///
    /// # Errors
    ///
    /// - [`TemplateError::MissingVariable`] naming the first required variable
    ///   (in sorted order) absent from `vars`
    /// - [`TemplateError::Syntax`] if the template is malformed
    /// - [`TemplateError::InvalidOutput`] if a JSON target renders invalid JSON
    /// - [`TemplateError::Render`] for any other engine failure
    pub fn render(
        &self,
        descriptor: &TemplateDescriptor,
        vars: &Variables,
    ) -> Result<String, TemplateError> {
        if descriptor.kind == TemplateKind::Verbatim {
            return Ok(descriptor.source.clone());
        }

        if let Some(variable) = first_missing(&descriptor.required_variables, vars) {
            return Err(TemplateError::MissingVariable {
                template: descriptor.id.clone(),
                variable: variable.to_string(),
            });
        }

        let env = environment();
        let template = env
            .template_from_named_str(&descriptor.id, &descriptor.source)
            .map_err(|e| engine_error(&descriptor.id, &e))?;
        let rendered = template
            .render(vars)
            .map_err(|e| engine_error(&descriptor.id, &e))?;

        if descriptor.is_json() {
            serde_json::from_str::<serde_json::Value>(&rendered).map_err(|e| {
                TemplateError::InvalidOutput {
                    template: descriptor.id.clone(),
                    message: e.to_string(),
                }
            })?;
        }

        Ok(rendered)
    }
}

/// First name in `required` (sorted) that `vars` lacks.
#[must_use]
pub fn first_missing<'a>(required: &'a BTreeSet<String>, vars: &Variables) -> Option<&'a str> {
    required
        .iter()
        .find(|name| !vars.contains_key(*name))
        .map(String::as_str)
}

/// Top-level variables `source` reads without defining them.
///
/// # Errors
///
/// Returns [`TemplateError::Syntax`] if `source` does not parse.
pub fn undeclared_variables(id: &str, source: &str) -> Result<BTreeSet<String>, TemplateError> {
    let env = environment();
    let template = env
        .template_from_named_str(id, source)
        .map_err(|e| engine_error(id, &e))?;
    Ok(template
        .undeclared_variables(false)
        .into_iter()
        .filter(|name| !BUILTINS.contains(&name.as_str()))
        .collect())
}

/// Strict engine: unknown variables are errors, output is never escaped,
/// and a trailing newline in the source is kept.
fn environment<'s>() -> Environment<'s> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    env
}

fn engine_error(template: &str, err: &minijinja::Error) -> TemplateError {
    let message = match (err.detail(), err.line()) {
        (Some(detail), Some(line)) => format!("{detail} (line {line})"),
        (Some(detail), None) => detail.to_string(),
        (None, Some(line)) => format!("{} (line {line})", err.kind()),
        (None, None) => err.kind().to_string(),
    };
    match err.kind() {
        ErrorKind::SyntaxError => TemplateError::Syntax {
            template: template.to_string(),
            message,
        },
        _ => TemplateError::Render {
            template: template.to_string(),
            message,
        },
    }
}
