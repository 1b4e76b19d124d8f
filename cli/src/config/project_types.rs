//! Built-in project type presets.
use crate::error::PlanError;

use super::env::EnvSnapshot;

/// A project type preset: MCP servers to configure and the environment it
/// expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectType {
    /// Identifier used on the command line.
    pub name: &'static str,
    /// Display name.
    pub title: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// MCP server names rendered into `mcp.json`.
    pub mcp_servers: &'static [&'static str],
    /// Variables that must be set before building.
    pub required_env: &'static [&'static str],
    /// Variables that enable extra integrations when set.
    pub optional_env: &'static [&'static str],
}

/// All known project types, sorted by name.
pub const PROJECT_TYPES: &[ProjectType] = &[
    ProjectType {
        name: "generic",
        title: "Generic",
        description: "Generic C++ project development",
        mcp_servers: &["build-intelligence", "workflow-orchestrator"],
        required_env: &[],
        optional_env: &["CONAN_USER_HOME", "GITHUB_TOKEN"],
    },
    ProjectType {
        name: "openssl",
        title: "OpenSSL",
        description: "OpenSSL cryptographic library development",
        mcp_servers: &[
            "openssl-context",
            "build-intelligence",
            "fips-compliance",
            "security-scanner",
        ],
        required_env: &["CONAN_USER_HOME", "OPENSSL_ROOT_DIR"],
        optional_env: &["CLOUDSMITH_API_KEY", "CONAN_REPOSITORY_NAME", "GITHUB_TOKEN"],
    },
];

/// Project type used when none is configured.
pub const DEFAULT_PROJECT_TYPE: &str = "generic";

/// Look up a project type by name.
///
/// # Errors
///
/// Returns [`PlanError::UnknownProjectType`] listing the known names.
pub fn lookup(name: &str) -> Result<&'static ProjectType, PlanError> {
    PROJECT_TYPES
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| PlanError::UnknownProjectType {
            name: name.to_string(),
            available: PROJECT_TYPES
                .iter()
                .map(|p| p.name)
                .collect::<Vec<_>>()
                .join(", "),
        })
}

/// Presence of a project type's environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvReport {
    /// Required variables that are unset.
    pub missing_required: Vec<&'static str>,
    /// Optional variables that are unset.
    pub missing_optional: Vec<&'static str>,
}

impl EnvReport {
    /// Whether every required variable is set.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_required.is_empty()
    }
}

impl ProjectType {
    /// Check which of this project type's variables are unset in `env`.
    #[must_use]
    pub fn check_env(&self, env: &EnvSnapshot) -> EnvReport {
        let missing = |vars: &[&'static str]| {
            vars.iter()
                .copied()
                .filter(|v| !env.is_set(v))
                .collect::<Vec<_>>()
        };
        EnvReport {
            missing_required: missing(self.required_env),
            missing_optional: missing(self.optional_env),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_types() {
        assert_eq!(lookup("openssl").unwrap().mcp_servers.len(), 4);
        assert_eq!(lookup("generic").unwrap().required_env.len(), 0);
    }

    #[test]
    fn lookup_unknown_lists_available() {
        let err = lookup("rust").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown project type 'rust' (available: generic, openssl)"
        );
    }

    #[test]
    fn default_project_type_exists() {
        assert!(lookup(DEFAULT_PROJECT_TYPE).is_ok());
    }

    #[test]
    fn openssl_env_report() {
        let env = EnvSnapshot::from_pairs([("CONAN_USER_HOME", "/c"), ("GITHUB_TOKEN", "t")]);
        let report = lookup("openssl").unwrap().check_env(&env);
        assert_eq!(report.missing_required, vec!["OPENSSL_ROOT_DIR"]);
        assert_eq!(
            report.missing_optional,
            vec!["CLOUDSMITH_API_KEY", "CONAN_REPOSITORY_NAME"]
        );
        assert!(!report.is_complete());
    }

    #[test]
    fn generic_is_always_complete() {
        let report = lookup("generic").unwrap().check_env(&EnvSnapshot::default());
        assert!(report.is_complete());
        assert_eq!(report.missing_optional.len(), 2);
    }
}
