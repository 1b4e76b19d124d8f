//! Domain-specific error types for the orchestrator.
//!
//! Internal modules return typed errors built with [`thiserror`]; command
//! handlers at the CLI boundary convert them to [`anyhow::Error`] via `?`.
//!
//! # Error hierarchy
//!
//! ```text
//! OrchestratorError
//! ├── Config(ConfigError)    : settings, config file, template directory
//! ├── Template(TemplateError): missing variables, syntax, invalid output
//! ├── Plan(PlanError)        : project types, custom rules, variables
//! └── Deploy(DeployError)    : writes and target conflicts
//! ```
//!
//! [`PlatformError`] stands apart: detection never fails, it only collects
//! these as warnings.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the orchestrator.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Settings could not be resolved.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A template could not be rendered.
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// A deployment plan could not be built.
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// Rendered output could not be written.
    #[error("Deployment error: {0}")]
    Deploy(#[from] DeployError),
}

/// Errors raised while resolving settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A flag, environment variable, or config key has an unusable value.
    #[error("Invalid value '{value}' for {key}: expected {expected}")]
    InvalidValue {
        /// Name of the flag, variable, or key.
        key: String,
        /// The rejected value.
        value: String,
        /// Description of the accepted values.
        expected: String,
    },

    /// The config file exists but is not valid TOML for the settings schema.
    #[error("Invalid config file {path}: {message}")]
    Parse {
        /// Path of the config file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// An I/O error occurred while reading a config or template file.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// No template directory could be located.
    #[error("cannot locate the template directory; use --templates or set CURSOR_RULES_PATH")]
    TemplatesNotFound,
}

/// Errors raised by the template renderer.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// A variable required by the template is absent from the context.
    #[error("template '{template}' requires variable '{variable}' which is not defined")]
    MissingVariable {
        /// Template identifier.
        template: String,
        /// Name of the missing variable.
        variable: String,
    },

    /// The template body is malformed.
    #[error("syntax error in template '{template}': {message}")]
    Syntax {
        /// Template identifier.
        template: String,
        /// Parser message, including line information.
        message: String,
    },

    /// The rendered text is not valid for its target format.
    #[error("template '{template}' rendered invalid output: {message}")]
    InvalidOutput {
        /// Template identifier.
        template: String,
        /// Validation message.
        message: String,
    },

    /// Rendering failed for any other reason.
    #[error("failed to render template '{template}': {message}")]
    Render {
        /// Template identifier.
        template: String,
        /// Engine message.
        message: String,
    },
}

/// Errors raised while building a deployment plan.
#[derive(Error, Debug)]
pub enum PlanError {
    /// A selected template requires a variable no source provides.
    #[error("template '{template}' requires variable '{variable}' which is not defined")]
    MissingVariable {
        /// Template identifier.
        template: String,
        /// Name of the missing variable.
        variable: String,
    },

    /// The requested project type is not known.
    #[error("unknown project type '{name}' (available: {available})")]
    UnknownProjectType {
        /// Requested project type.
        name: String,
        /// Comma-separated list of known project types.
        available: String,
    },

    /// A custom rule path cannot be used.
    #[error("custom rule {path}: {reason}")]
    CustomRule {
        /// Path given on the command line or in the config file.
        path: PathBuf,
        /// Why the rule was rejected.
        reason: String,
    },
}

/// Errors raised while writing rendered output.
#[derive(Error, Debug)]
pub enum DeployError {
    /// A file could not be written or renamed into place.
    #[error("failed to write {path}: {source}")]
    WriteFailure {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Two templates target the same path; resolved by precedence.
    #[error("{target}: '{kept}' overrides '{replaced}'")]
    ConflictingTarget {
        /// Target path relative to the repository root.
        target: String,
        /// Template that wins.
        kept: String,
        /// Template that is discarded.
        replaced: String,
    },
}

/// Errors raised by platform detection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// Detection found conflicting or unrecognised signals; defaults applied.
    #[error("ambiguous detection: {0}")]
    DetectionAmbiguous(String),
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn missing_variable_names_the_key() {
        let e = TemplateError::MissingVariable {
            template: "rules/shared.mdc".to_string(),
            variable: "project_name".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "template 'rules/shared.mdc' requires variable 'project_name' which is not defined"
        );
    }

    #[test]
    fn plan_and_template_missing_variable_read_the_same() {
        let t = TemplateError::MissingVariable {
            template: "a".to_string(),
            variable: "b".to_string(),
        };
        let p = PlanError::MissingVariable {
            template: "a".to_string(),
            variable: "b".to_string(),
        };
        assert_eq!(t.to_string(), p.to_string());
    }

    #[test]
    fn syntax_error_display() {
        let e = TemplateError::Syntax {
            template: "mcp.json".to_string(),
            message: "unexpected end of input (line 3)".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "syntax error in template 'mcp.json': unexpected end of input (line 3)"
        );
    }

    #[test]
    fn unknown_project_type_lists_available() {
        let e = PlanError::UnknownProjectType {
            name: "rust".to_string(),
            available: "generic, openssl".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "unknown project type 'rust' (available: generic, openssl)"
        );
    }

    #[test]
    fn plan_error_is_transparent_over_template_error() {
        let inner = TemplateError::Syntax {
            template: "x".to_string(),
            message: "bad".to_string(),
        };
        let expected = inner.to_string();
        let e: PlanError = inner.into();
        assert_eq!(e.to_string(), expected);
    }

    #[test]
    fn write_failure_has_source() {
        use std::error::Error as StdError;
        let e = DeployError::WriteFailure {
            path: PathBuf::from("/repo/.cursor/mcp.json"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("/repo/.cursor/mcp.json"));
    }

    #[test]
    fn conflicting_target_display() {
        let e = DeployError::ConflictingTarget {
            target: ".cursor/rules/shared.mdc".to_string(),
            kept: "custom:shared.mdc".to_string(),
            replaced: "rules/shared.mdc".to_string(),
        };
        assert_eq!(
            e.to_string(),
            ".cursor/rules/shared.mdc: 'custom:shared.mdc' overrides 'rules/shared.mdc'"
        );
    }

    #[test]
    fn orchestrator_error_from_variants() {
        let e: OrchestratorError = ConfigError::TemplatesNotFound.into();
        assert!(e.to_string().starts_with("Configuration error"));
        let e: OrchestratorError = PlanError::CustomRule {
            path: PathBuf::from("team.mdc"),
            reason: "not found".to_string(),
        }
        .into();
        assert_eq!(e.to_string(), "Planning error: custom rule team.mdc: not found");
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<OrchestratorError>();
        assert_send_sync::<ConfigError>();
        assert_send_sync::<TemplateError>();
        assert_send_sync::<PlanError>();
        assert_send_sync::<DeployError>();
        assert_send_sync::<PlatformError>();
    }

    #[test]
    fn errors_convert_to_anyhow() {
        let _e: anyhow::Error = PlanError::CustomRule {
            path: PathBuf::from("x"),
            reason: "missing".to_string(),
        }
        .into();
        let _e: anyhow::Error = ConfigError::TemplatesNotFound.into();
    }
}
