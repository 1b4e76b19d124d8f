//! Environment variables captured once per run.
use std::collections::BTreeMap;

/// Opt-out flag; truthy values skip deployment.
pub const OPT_OUT: &str = "MCP_ORCHESTRATOR_OPT_OUT";
/// Explicit platform override (`linux`, `macos`, `windows`).
pub const PLATFORM: &str = "MCP_ORCHESTRATOR_PLATFORM";
/// Explicit CI override; any boolean-like value.
pub const CI: &str = "MCP_ORCHESTRATOR_CI";
/// Replaces `<root>/.cursor` as the output directory.
pub const CURSOR_CONFIG_PATH: &str = "CURSOR_CONFIG_PATH";
/// Template directory.
pub const CURSOR_RULES_PATH: &str = "CURSOR_RULES_PATH";
/// Path of the `orchestrator.toml` config file.
pub const CONFIG: &str = "MCP_ORCHESTRATOR_CONFIG";

/// Immutable copy of the process environment.
///
/// Taken at the start of a run so every later stage reads the same values
/// and tests can inject an environment without mutating the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment. Non-UTF-8 entries are dropped.
    #[must_use]
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    /// Build a snapshot from explicit pairs.
    #[must_use]
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of `key`, treating empty strings as unset.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Whether `key` is set to a non-empty value.
    #[must_use]
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Whether `key` holds a truthy value.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(is_truthy)
    }
}

/// `1`, `true`, `yes` and `on` (case-insensitive) are truthy.
#[must_use]
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse a boolean-like value; `None` when it is neither truthy nor falsy.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
